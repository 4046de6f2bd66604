//! # nb-dev
//!
//! The dev-server integration shell for the nb bridge.
//!
//! Wires the pieces of the workspace into a running dev-server companion:
//!
//! - resolves the plugin configuration and computes build paths
//! - assembles the transform pipeline (component annotator, placeholder
//!   URL rewriting)
//! - mounts the SSR bridge's HTTP endpoints
//! - watches the project tree, fanning change events out to the SSR cache
//!   invalidation and the router watcher
//! - owns the hot marker files for the backend framework, removing them on
//!   every exit path
//!
//! The bundler's module graph and module runner are injected; see
//! [`nb_core`] for the seams.

pub mod error;
pub mod hot;
pub mod logging;
pub mod rewrite;
pub mod routes;
pub mod shell;
pub mod watch;

pub use error::{DevError, Result};
pub use hot::HotFiles;
pub use logging::{init_logging, LogLevel};
pub use rewrite::{rewrite_dev_server_urls, DevServerUrlPlugin, DEV_SERVER_PLACEHOLDER};
pub use routes::{compile_route_pattern, RouterWatcher};
pub use shell::{DevShell, DevShellOptions};
pub use watch::{FileChange, FileWatcher};
