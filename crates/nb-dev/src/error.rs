//! Shell-level errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DevError {
    /// Configuration resolution failed (startup-fatal)
    #[error("Configuration error: {0}")]
    Config(#[from] nb_config::ConfigError),

    /// File watching errors
    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// I/O errors from marker files and friends
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Development server errors
    #[error("Server error: {0}")]
    Server(String),

    /// A router glob pattern could not be compiled
    #[error("Invalid route pattern '{pattern}': {message}")]
    Pattern {
        /// The offending pattern
        pattern: String,
        /// Compilation failure detail
        message: String,
    },
}

pub type Result<T, E = DevError> = std::result::Result<T, E>;
