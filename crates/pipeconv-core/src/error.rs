//! Error types for pipeconv-core

use thiserror::Error;

/// Result type alias for pipeconv-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in pipeconv-core
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file could not be found
    #[error("configuration file not found: {path}")]
    ConfigNotFound {
        /// Path that was searched
        path: String,
    },

    /// Failed to parse YAML configuration or document
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Invalid configuration value
    #[error("invalid configuration: {message}")]
    ConfigInvalid {
        /// Description of what's invalid
        message: String,
    },

    /// Pipeline document could not be read
    #[error("unsupported pipeline document '{path}': expected .yaml, .yml or .json")]
    UnsupportedDocument {
        /// Path of the rejected document
        path: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
