//! Error types for STRATA.
//!
//! All errors use `thiserror` for ergonomic error handling and proper error
//! chains. Expected terminal outcomes (a stack that finishes in a failed
//! state, a permission grant that hits an existing statement id, an operator
//! declining a gate) are modeled as values, not errors; only genuine faults
//! land here.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for STRATA operations.
pub type Result<T> = std::result::Result<T, StrataError>;

/// Main error type for STRATA.
#[derive(Error, Debug)]
pub enum StrataError {
    // Provisioning errors
    #[error("Stack submission rejected for {stack}: {reason}")]
    SubmissionFailed { stack: String, reason: String },

    #[error("Stack not found: {stack}")]
    StackNotFound { stack: String },

    #[error("Stack {stack} did not reach a terminal state after {attempts} polls")]
    PollTimeout { stack: String, attempts: u32 },

    #[error("Deployment of stack {stack} was cancelled")]
    Cancelled { stack: String },

    // Wiring errors
    #[error("Failed to grant invoke permission on function {function}: {reason}")]
    GrantFailed { function: String, reason: String },

    #[error("Failed to register notification rule on bucket {bucket}: {reason}")]
    NotificationFailed { bucket: String, reason: String },

    #[error("Failed to replace bucket policy on {bucket}: {reason}")]
    PolicyWriteFailed { bucket: String, reason: String },

    // Smoke-test errors
    #[error("Failed to upload {key} to bucket {bucket}: {reason}")]
    UploadFailed { bucket: String, key: String, reason: String },

    // Operator boundary errors
    #[error("Operator prompt failed: {reason}")]
    PromptFailed { reason: String },

    // Configuration errors
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    // File system errors
    #[error("File not found: {path:?}. {hint}")]
    FileNotFound { path: PathBuf, hint: String },

    #[error("I/O error at {path:?}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StrataError {
    /// Create an Internal error from any error type.
    pub fn internal(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Internal(err.to_string())
    }
}
