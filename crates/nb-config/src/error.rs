//! Configuration errors.
//!
//! All variants are startup-fatal: they are raised at dev-server
//! config-resolution time, before any request is served.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required field is absent
    #[error("Missing required field: {field}\n\nHint: {hint}")]
    MissingField {
        /// Name of the missing field
        field: String,
        /// Helpful hint for providing the field
        hint: String,
    },

    /// A field holds an unusable value
    #[error("Invalid value for '{field}': {value}\n\nHint: {hint}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The invalid value
        value: String,
        /// Helpful hint for correct values
        hint: String,
    },

    /// I/O error while reading config
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = ConfigError> = std::result::Result<T, E>;
