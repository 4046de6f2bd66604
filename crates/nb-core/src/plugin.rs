//! Explicit plugin-hook pipeline.
//!
//! The host dev server drives a fixed-order pipeline of plugins through four
//! optional lifecycle hooks: config resolution, server start, per-file
//! transform, and bundle write. Plugins implement only the hooks they care
//! about; the rest default to no-ops.
//!
//! Per-file transform failures are contained at the plugin boundary: a
//! failing plugin is logged and skipped, the file's current code flows on to
//! the next plugin unchanged, and the build never aborts because of it.

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Output of a transform hook: new source text plus an optional source map
/// (JSON string) tied to the original file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOutput {
    pub code: String,
    pub map: Option<String>,
}

impl TransformOutput {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            map: None,
        }
    }

    pub fn with_map(code: impl Into<String>, map: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            map: Some(map.into()),
        }
    }
}

/// Paths handed to plugins when the dev server's configuration is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveContext {
    /// Project root directory
    pub root: PathBuf,
    /// Build output directory
    pub out_dir: PathBuf,
}

/// Live-server details handed to plugins once the server is listening.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    /// Externally reachable origin, e.g. `http://127.0.0.1:5173`
    pub origin: String,
    /// Project root directory
    pub root: PathBuf,
}

/// A dev-server plugin with optional lifecycle hooks.
///
/// Hooks run on the dev server's cooperative event loop and must not block.
pub trait DevPlugin: Send + Sync {
    /// Plugin name for logging and diagnostics.
    fn name(&self) -> Cow<'static, str>;

    /// Called once when configuration has been resolved.
    fn on_config_resolve(&self, _ctx: &ResolveContext) {}

    /// Called once when the dev server starts listening.
    fn on_server_start(&self, _server: &ServerInfo) {}

    /// Called for each served file; return `None` to pass the code through
    /// unchanged.
    fn on_transform(&self, _code: &str, _id: &Path) -> anyhow::Result<Option<TransformOutput>> {
        Ok(None)
    }

    /// Called after the bundle has been written in a production build.
    fn on_bundle_write(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Fixed-order pipeline over registered plugins.
#[derive(Default)]
pub struct PluginPipeline {
    plugins: Vec<Arc<dyn DevPlugin>>,
}

impl PluginPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a plugin; hooks run in registration order.
    pub fn register(&mut self, plugin: Arc<dyn DevPlugin>) {
        self.plugins.push(plugin);
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn config_resolved(&self, ctx: &ResolveContext) {
        for plugin in &self.plugins {
            plugin.on_config_resolve(ctx);
        }
    }

    pub fn server_started(&self, server: &ServerInfo) {
        for plugin in &self.plugins {
            plugin.on_server_start(server);
        }
    }

    /// Run `code` through every transform hook in order.
    ///
    /// Each plugin sees the output of the previous one. The source map of
    /// the last plugin that produced one is kept; a plugin returning an
    /// error is logged and skipped.
    pub fn transform(&self, code: &str, id: &Path) -> Option<TransformOutput> {
        let mut current: Option<TransformOutput> = None;

        for plugin in &self.plugins {
            let input = current.as_ref().map(|t| t.code.as_str()).unwrap_or(code);
            match plugin.on_transform(input, id) {
                Ok(Some(output)) => {
                    let map = output.map.or_else(|| current.take().and_then(|t| t.map));
                    current = Some(TransformOutput {
                        code: output.code,
                        map,
                    });
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(
                        "Plugin {} failed to transform {}: {e}",
                        plugin.name(),
                        id.display()
                    );
                }
            }
        }

        current
    }

    pub fn bundle_written(&self) {
        for plugin in &self.plugins {
            if let Err(e) = plugin.on_bundle_write() {
                tracing::warn!("Plugin {} failed in bundle-write hook: {e}", plugin.name());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Suffixer(&'static str);

    impl DevPlugin for Suffixer {
        fn name(&self) -> Cow<'static, str> {
            "suffixer".into()
        }

        fn on_transform(&self, code: &str, _id: &Path) -> anyhow::Result<Option<TransformOutput>> {
            Ok(Some(TransformOutput::new(format!("{code}{}", self.0))))
        }
    }

    struct Failing;

    impl DevPlugin for Failing {
        fn name(&self) -> Cow<'static, str> {
            "failing".into()
        }

        fn on_transform(&self, _code: &str, _id: &Path) -> anyhow::Result<Option<TransformOutput>> {
            anyhow::bail!("parse exploded")
        }
    }

    #[test]
    fn transform_chains_in_registration_order() {
        let mut pipeline = PluginPipeline::new();
        pipeline.register(Arc::new(Suffixer(";a")));
        pipeline.register(Arc::new(Suffixer(";b")));

        let out = pipeline
            .transform("base", Path::new("js/app.tsx"))
            .expect("both plugins transformed");
        assert_eq!(out.code, "base;a;b");
    }

    #[test]
    fn failing_plugin_is_skipped() {
        let mut pipeline = PluginPipeline::new();
        pipeline.register(Arc::new(Failing));
        pipeline.register(Arc::new(Suffixer(";ok")));

        let out = pipeline
            .transform("base", Path::new("js/app.tsx"))
            .expect("second plugin still runs");
        assert_eq!(out.code, "base;ok");
    }

    #[test]
    fn no_transformers_means_unchanged() {
        let pipeline = PluginPipeline::new();
        assert!(pipeline.transform("base", Path::new("js/app.tsx")).is_none());
    }
}
