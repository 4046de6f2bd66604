//! Narrow interface onto the dev server's module runner.
//!
//! The runner is an execution context inside the dev server that can import
//! and run source files as live modules, with the server's own transform
//! pipeline and source maps applied. The SSR bridge only needs to import an
//! entry module, pull a callable export out of it, and drop the runner's
//! internal cache when files change.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Failure surfaced by a render function.
///
/// Carries the message and, when the underlying runtime provides one, a
/// stack trace. Both travel verbatim into the render endpoint's JSON error
/// body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderFailure {
    pub message: String,
    pub stack: Option<String>,
}

impl RenderFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack: None,
        }
    }

    pub fn with_stack(message: impl Into<String>, stack: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack: Some(stack.into()),
        }
    }
}

impl fmt::Display for RenderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for RenderFailure {}

impl From<String> for RenderFailure {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

/// Future returned by a render function invocation.
pub type RenderFuture = Pin<Box<dyn Future<Output = Result<Value, RenderFailure>> + Send>>;

/// A bound render function handle.
///
/// Takes a page descriptor (arbitrary JSON) and resolves to the rendered
/// result. Handles are cheap to clone and shared across requests.
pub type RenderFn = Arc<dyn Fn(Value) -> RenderFuture + Send + Sync>;

/// A single export of an imported module.
#[derive(Clone)]
pub enum ExportValue {
    /// A callable export
    Function(RenderFn),
    /// A plain data export
    Value(Value),
}

impl fmt::Debug for ExportValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportValue::Function(_) => f.write_str("ExportValue::Function"),
            ExportValue::Value(v) => write!(f, "ExportValue::Value({v})"),
        }
    }
}

/// The namespace of an imported module, keyed by export name.
#[derive(Debug, Clone, Default)]
pub struct ModuleExports {
    exports: HashMap<String, ExportValue>,
}

impl ModuleExports {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ExportValue) {
        self.exports.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&ExportValue> {
        self.exports.get(name)
    }

    /// Resolve a named export to a callable handle.
    ///
    /// Returns `None` when the export is absent or not a function.
    pub fn render_export(&self, name: &str) -> Option<RenderFn> {
        match self.exports.get(name) {
            Some(ExportValue::Function(f)) => Some(Arc::clone(f)),
            _ => None,
        }
    }
}

/// Errors raised while importing a module through the runner.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The entry module failed to load or evaluate
    #[error("Failed to load module {}: {message}", .path.display())]
    Load {
        /// Path of the module that failed
        path: PathBuf,
        /// Runner-provided failure description
        message: String,
    },

    /// I/O failure reading module sources
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RunnerError {
    pub fn load(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Load {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Consumed interface of the server-environment module runner.
#[async_trait]
pub trait ModuleRunner: Send + Sync {
    /// Import `entry` and return its exports.
    ///
    /// The runner applies the dev server's transform pipeline and caches
    /// evaluated modules internally until [`clear_cache`](Self::clear_cache)
    /// is called.
    async fn import(&self, entry: &Path) -> Result<ModuleExports, RunnerError>;

    /// Drop every cached module so the next import re-evaluates from source.
    fn clear_cache(&self);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn constant_render(result: Value) -> RenderFn {
        Arc::new(move |_page| {
            let result = result.clone();
            Box::pin(async move { Ok(result) })
        })
    }

    #[tokio::test]
    async fn render_export_resolves_functions_only() {
        let mut exports = ModuleExports::new();
        exports.insert("version", ExportValue::Value(json!("1.0")));
        exports.insert(
            "render",
            ExportValue::Function(constant_render(json!({"body": "<div/>"}))),
        );

        assert!(exports.render_export("version").is_none());
        assert!(exports.render_export("missing").is_none());

        let render = exports.render_export("render").expect("callable export");
        let result = render(json!({})).await.unwrap();
        assert_eq!(result, json!({"body": "<div/>"}));
    }

    #[test]
    fn render_failure_display_is_message() {
        let failure = RenderFailure::with_stack("boom", "at render (app.tsx:1:1)");
        assert_eq!(failure.to_string(), "boom");
        assert_eq!(failure.stack.as_deref(), Some("at render (app.tsx:1:1)"));
    }

    #[test]
    fn runner_error_mentions_path() {
        let err = RunnerError::load("/project/js/ssr_dev.ts", "syntax error");
        assert!(err.to_string().contains("js/ssr_dev.ts"));
        assert!(err.to_string().contains("syntax error"));
    }
}
