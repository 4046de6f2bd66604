//! # nb-config
//!
//! Configuration for the nb dev-server bridge.
//!
//! Users hand the plugin a partial configuration (usually from
//! `nb.config.json`); this crate resolves it against the recognized defaults
//! into an immutable [`PluginConfig`], validates it, and computes the
//! absolute paths the rest of the workspace works with. Resolution happens
//! once at dev-server config-resolution time; the resolved value is
//! read-only for the server's lifetime.
//!
//! Load priority mirrors the rest of the nb tooling: defaults, then the
//! config file, then `NB_*` environment variables.

pub mod config;
pub mod error;
pub mod paths;

pub use config::{
    ComponentPathConfig, Environment, PartialPluginConfig, PluginConfig, RoutesConfig,
    SsrDevConfig, TlsDetection,
};
pub use error::{ConfigError, Result};
pub use paths::ResolvedPaths;
