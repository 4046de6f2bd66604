//! # nb-core
//!
//! Shared seams for the nb dev-server bridge.
//!
//! The bridge sits between a backend framework's asset pipeline and the
//! frontend bundler's dev server. The bundler owns the heavy machinery (the
//! module dependency graph, the server-side module runner, the HMR channel);
//! this crate exposes those collaborators as narrow traits so every other
//! crate in the workspace can depend on exactly the operations it consumes:
//!
//! - [`ModuleGraph`]: invalidation and full-reload signaling
//! - [`ModuleRunner`]: importing source files as live modules
//! - [`DevPlugin`] / [`PluginPipeline`]: lifecycle hooks invoked by the
//!   host dev server in registration order
//!
//! Nothing here performs I/O. Concrete implementations live with the host
//! bundler; the test suites in the consuming crates provide in-memory fakes.

pub mod graph;
pub mod plugin;
pub mod runner;

pub use graph::{ModuleGraph, ModuleId, ModuleNode};
pub use plugin::{DevPlugin, PluginPipeline, ResolveContext, ServerInfo, TransformOutput};
pub use runner::{
    ExportValue, ModuleExports, ModuleRunner, RenderFailure, RenderFn, RenderFuture, RunnerError,
};
