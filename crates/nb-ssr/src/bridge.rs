//! The render-and-cache state machine.

use crate::error::SsrError;
use nb_config::SsrDevConfig;
use nb_core::{ModuleGraph, ModuleRunner, RenderFn};
use parking_lot::RwLock;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Name of the export the SSR entry module must expose.
pub const RENDER_EXPORT: &str = "render";

/// Generated artifacts whose changes never invalidate the render cache:
/// the routing-helper module and its type-declaration companion.
const GENERATED_ARTIFACT_BASENAMES: [&str; 2] = ["routes.js", "routes.d.ts"];

/// Extensions of files that participate in the render dependency closure.
const SCRIPT_EXTENSIONS: [&str; 5] = ["js", "jsx", "ts", "tsx", "mjs"];

pub struct SsrBridgeOptions {
    pub config: SsrDevConfig,
    /// Project root the entry point and watched files are anchored to
    pub project_root: PathBuf,
    pub runner: Arc<dyn ModuleRunner>,
    pub graph: Arc<dyn ModuleGraph>,
}

/// The SSR render bridge.
///
/// One instance per dev server; shared across requests behind an `Arc`.
/// The cached render slot is mutated without locks held across awaits:
/// a clear or set of the single reference is atomic within one cooperative
/// turn, and concurrent loads race benignly (last successful load wins,
/// loads are idempotent for the same source state).
pub struct SsrBridge {
    config: SsrDevConfig,
    root: PathBuf,
    runner: Arc<dyn ModuleRunner>,
    graph: Arc<dyn ModuleGraph>,
    cache: RwLock<Option<RenderFn>>,
}

impl SsrBridge {
    pub fn new(options: SsrBridgeOptions) -> Self {
        Self {
            config: options.config,
            root: options.project_root,
            runner: options.runner,
            graph: options.graph,
            cache: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &SsrDevConfig {
        &self.config
    }

    /// Whether a render function is currently cached.
    pub fn is_ready(&self) -> bool {
        self.cache.read().is_some()
    }

    /// Absolute path of the SSR entry point.
    pub fn entry_path(&self) -> PathBuf {
        let entry = Path::new(&self.config.entry_point);
        if entry.is_absolute() {
            entry.to_path_buf()
        } else {
            let trimmed = entry.strip_prefix(".").unwrap_or(entry);
            self.root.join(trimmed)
        }
    }

    /// Eager load at server startup.
    ///
    /// A warm-up failure must not prevent the dev server from starting:
    /// requests re-attempt the load and surface the error per-request.
    pub async fn warm_up(&self) {
        match self.load().await {
            Ok(_) => tracing::info!("SSR render function ready ({})", self.config.entry_point),
            Err(e) => tracing::warn!("SSR warm-up failed, will retry on first request: {e}"),
        }
    }

    /// React to a file-change event from the dev server's watcher.
    pub fn handle_file_change(&self, path: &Path) {
        if !path.starts_with(&self.root) {
            return;
        }
        let is_script = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| SCRIPT_EXTENSIONS.contains(&ext));
        if !is_script {
            return;
        }
        let basename = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if GENERATED_ARTIFACT_BASENAMES.contains(&basename) {
            tracing::debug!(
                "Ignoring generated artifact change: {}",
                path.display()
            );
            return;
        }

        // Graph first, runner second, render slot last.
        let affected = self.graph.invalidate_by_file(path);
        self.runner.clear_cache();
        self.clear();
        tracing::debug!(
            "Invalidated SSR cache for {} ({} graph nodes)",
            path.display(),
            affected.len()
        );
    }

    /// Empty the render slot. The next request reloads from scratch.
    pub fn clear(&self) {
        *self.cache.write() = None;
    }

    /// Load the entry module and cache its render export.
    ///
    /// Invalidation always precedes the import so the load can never read
    /// stale cached modules.
    pub async fn load(&self) -> Result<RenderFn, SsrError> {
        let entry = self.entry_path();
        self.graph.invalidate_by_file(&entry);
        self.runner.clear_cache();

        let exports = self.runner.import(&entry).await?;
        let render = exports
            .render_export(RENDER_EXPORT)
            .ok_or(SsrError::MissingRenderExport { entry })?;

        *self.cache.write() = Some(Arc::clone(&render));
        Ok(render)
    }

    /// Render a page descriptor, loading the render function on cache miss.
    pub async fn render(&self, page: Value) -> Result<Value, SsrError> {
        let cached = self.cache.read().clone();
        let render = match cached {
            Some(render) => render,
            None => self.load().await?,
        };
        render(page).await.map_err(SsrError::Render)
    }
}
