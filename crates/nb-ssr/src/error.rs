//! SSR bridge errors and their JSON wire shape.

use nb_core::{RenderFailure, RunnerError};
use serde_json::{json, Value};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SsrError {
    /// The entry module loaded but has no callable `render` export
    #[error("SSR entry point {} does not expose a callable 'render' export\n\nHint: export an async function named 'render' from the SSR entry", .entry.display())]
    MissingRenderExport {
        /// Resolved entry-point path
        entry: PathBuf,
    },

    /// The module runner failed to load the entry
    #[error(transparent)]
    Runner(#[from] RunnerError),

    /// The render function itself threw
    #[error("{0}")]
    Render(RenderFailure),

    /// The request body was not valid JSON
    #[error("Invalid request body: {0}")]
    InvalidBody(#[from] serde_json::Error),
}

impl SsrError {
    /// Message reported to the HTTP caller.
    pub fn message(&self) -> String {
        match self {
            SsrError::Render(failure) => failure.message.clone(),
            other => other.to_string(),
        }
    }

    /// Stack trace, when the failing render runtime provided one.
    pub fn stack(&self) -> Option<&str> {
        match self {
            SsrError::Render(failure) => failure.stack.as_deref(),
            _ => None,
        }
    }

    /// The `500` response body: `{"success": false, "error": {...}}` with
    /// the stack key omitted when no stack is available.
    pub fn to_error_body(&self) -> Value {
        let mut error = serde_json::Map::new();
        error.insert("message".to_string(), Value::String(self.message()));
        if let Some(stack) = self.stack() {
            error.insert("stack".to_string(), Value::String(stack.to_string()));
        }
        json!({ "success": false, "error": Value::Object(error) })
    }
}
