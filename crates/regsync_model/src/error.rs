//! Error types for the regsync model.

use std::io;
use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors that can occur when reading or writing snapshots.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Content failed to parse into a snapshot.
    #[error("malformed snapshot: {message}")]
    Malformed {
        /// Description of the parse failure.
        message: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ModelError {
    /// Creates a malformed-content error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        Self::malformed(err.to_string())
    }
}
