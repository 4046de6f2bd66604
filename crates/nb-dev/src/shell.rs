//! Dev-server integration shell.
//!
//! Thin but load-bearing: resolves configuration, assembles the transform
//! pipeline (component annotator + URL rewriting), constructs the SSR
//! bridge and router watcher, owns the hot marker files, and runs the
//! watch-and-serve loop that fans file-change events out to its parts.

use crate::error::{DevError, Result};
use crate::hot::HotFiles;
use crate::routes::RouterWatcher;
use crate::rewrite::DevServerUrlPlugin;
use crate::watch::{FileChange, FileWatcher};
use axum::Router;
use nb_annotate::{Annotator, AnnotatorOptions};
use nb_config::{PluginConfig, ResolvedPaths, TlsDetection};
use nb_core::{ModuleGraph, ModuleRunner, PluginPipeline, ServerInfo, TransformOutput};
use nb_ssr::{router as ssr_router, SsrBridge, SsrBridgeOptions};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Debounce for the shell's own file watcher, in milliseconds.
const WATCH_DEBOUNCE_MS: u64 = 100;

pub struct DevShellOptions {
    pub project_root: PathBuf,
    pub addr: SocketAddr,
    pub runner: Arc<dyn ModuleRunner>,
    pub graph: Arc<dyn ModuleGraph>,
}

/// The assembled dev-server integration.
pub struct DevShell {
    config: PluginConfig,
    paths: ResolvedPaths,
    pipeline: PluginPipeline,
    bridge: Option<Arc<SsrBridge>>,
    router_watcher: Option<Arc<RouterWatcher>>,
    hot_files: Arc<HotFiles>,
    addr: SocketAddr,
}

impl DevShell {
    pub fn new(config: PluginConfig, options: DevShellOptions) -> Result<Self> {
        let paths = ResolvedPaths::compute(&config, &options.project_root);

        let mut pipeline = PluginPipeline::new();
        if config.component_path.enabled {
            let mut annotator_options = AnnotatorOptions::new(
                config
                    .component_path
                    .root
                    .clone()
                    .unwrap_or_else(|| options.project_root.clone()),
            );
            annotator_options.include_extension = config.component_path.include_extension;
            annotator_options.verbose = config.component_path.verbose;
            pipeline.register(Arc::new(Annotator::new(annotator_options)));
        }
        pipeline.register(Arc::new(DevServerUrlPlugin::new()));

        let bridge = config.ssr_dev.enabled.then(|| {
            Arc::new(SsrBridge::new(SsrBridgeOptions {
                config: config.ssr_dev.clone(),
                project_root: options.project_root.clone(),
                runner: Arc::clone(&options.runner),
                graph: Arc::clone(&options.graph),
            }))
        });

        let router_watcher = RouterWatcher::new(
            &config.nb_routes,
            options.project_root.clone(),
            Arc::clone(&options.graph),
        )?;

        let mut hot_files = HotFiles::new().add(paths.hot_file.clone());
        if config.ssr_dev.enabled {
            hot_files = hot_files
                .add_with_sub_path(paths.ssr_hot_file.clone(), config.ssr_dev.path.clone());
        }

        pipeline.config_resolved(&paths.resolve_context());

        Ok(Self {
            config,
            paths,
            pipeline,
            bridge,
            router_watcher,
            hot_files: Arc::new(hot_files),
            addr: options.addr,
        })
    }

    /// The externally reachable origin of the dev server.
    pub fn origin(&self) -> String {
        match &self.config.detect_tls {
            // Certificate handling is the host server's concern; without a
            // forced host the origin stays plain HTTP on the bound address.
            TlsDetection::Off | TlsDetection::Auto => format!("http://{}", self.addr),
            TlsDetection::Host(host) => format!("https://{host}"),
        }
    }

    pub fn paths(&self) -> &ResolvedPaths {
        &self.paths
    }

    pub fn ssr_bridge(&self) -> Option<&Arc<SsrBridge>> {
        self.bridge.as_ref()
    }

    /// Router with the SSR endpoints mounted; merge into the host's router.
    pub fn router(&self) -> Router {
        match &self.bridge {
            Some(bridge) => ssr_router(Arc::clone(bridge)),
            None => Router::new(),
        }
    }

    /// Run `code` through the transform pipeline.
    pub fn transform(&self, code: &str, id: &Path) -> Option<TransformOutput> {
        self.pipeline.transform(code, id)
    }

    /// Inform plugins that the server is listening.
    pub fn notify_server_started(&self, origin: &str) {
        self.pipeline.server_started(&ServerInfo {
            origin: origin.to_string(),
            root: self.paths.root.clone(),
        });
    }

    /// Fan a watcher event out to the SSR bridge and the router watcher.
    pub fn handle_file_change(&self, change: &FileChange) {
        let path = change.path();
        if let Some(bridge) = &self.bridge {
            bridge.handle_file_change(path);
        }
        if let Some(watcher) = &self.router_watcher {
            watcher.handle_change(path);
        }
    }

    /// Serve until interrupted.
    ///
    /// Binds the address, writes the hot markers, warms the SSR cache, and
    /// then loops over watcher events until ctrl-c. Marker-file problems are
    /// logged, never fatal.
    pub async fn run(self) -> Result<()> {
        let origin = self.origin();

        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .map_err(|e| DevError::Server(format!("Failed to bind to {}: {e}", self.addr)))?;

        let (watcher, mut change_rx) = FileWatcher::new(
            self.paths.root.clone(),
            vec![self.config.build_directory.clone()],
            WATCH_DEBOUNCE_MS,
        )?;
        tracing::info!("Watching for changes in {}", watcher.root().display());

        if let Err(e) = self.hot_files.write(&origin) {
            tracing::warn!("Failed to write hot file: {e}");
        }
        self.hot_files.install_signal_cleanup();

        self.notify_server_started(&origin);
        if let Some(bridge) = &self.bridge {
            bridge.warm_up().await;
        }

        tracing::info!("Dev-server bridge listening at {origin}");
        let router = self.router();
        let mut server = tokio::spawn(async move { axum::serve(listener, router).await });

        loop {
            tokio::select! {
                Some(change) = change_rx.recv() => {
                    self.handle_file_change(&change);
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutting down dev-server bridge");
                    break;
                }
                result = &mut server => {
                    match result {
                        Ok(Err(e)) => return Err(DevError::Server(e.to_string())),
                        Ok(Ok(())) => tracing::warn!("Server task completed unexpectedly"),
                        Err(e) => return Err(DevError::Server(format!("Server task panicked: {e}"))),
                    }
                    break;
                }
            }
        }

        self.hot_files.remove();
        Ok(())
    }
}
