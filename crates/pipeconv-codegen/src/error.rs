//! Error types for code generation
//!
//! Only IR construction can fail. Compilation itself degrades to comments and
//! [`crate::Diagnostic`]s instead of returning errors.

use thiserror::Error;

/// Result type for codegen operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building the IR
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to read or parse the pipeline document
    #[error("failed to load pipeline document: {0}")]
    Document(#[from] pipeconv_core::Error),

    /// Structurally invalid pipeline graph
    #[error("invalid pipeline '{pipeline}': {message}")]
    InvalidPipeline {
        /// Pipeline name
        pipeline: String,
        /// Error description
        message: String,
    },
}
