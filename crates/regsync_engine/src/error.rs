//! Error types for the sync engine.

use regsync_model::ModelError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during a sync cycle.
///
/// Every error is local to a single cycle: it is recorded into the
/// orchestrator's `last_error`, pushed to the status feed, and surfaces
/// as the `Error` state. There is no automatic retry; the next periodic
/// tick or a manual trigger is the recovery path.
#[derive(Debug, Error)]
pub enum SyncError {
    /// No valid authorized session for the remote store.
    #[error("authentication missing")]
    AuthenticationMissing,

    /// Network or remote failure during list, upload or download.
    #[error("transfer failed: {message}")]
    Transfer {
        /// Captured failure message.
        message: String,
    },

    /// Downloaded content failed to parse into a snapshot.
    /// The local store stays untouched when this occurs.
    #[error("malformed remote content: {0}")]
    MalformedRemoteContent(#[source] ModelError),

    /// Cannot read the local store or its modification time.
    #[error("local store error: {message}")]
    LocalIo {
        /// Captured failure message.
        message: String,
    },

    /// A remote operation exceeded the configured timeout.
    #[error("operation timed out")]
    Timeout,
}

impl SyncError {
    /// Creates a transfer error.
    pub fn transfer(message: impl Into<String>) -> Self {
        Self::Transfer {
            message: message.into(),
        }
    }

    /// Creates a local I/O error.
    pub fn local_io(message: impl Into<String>) -> Self {
        Self::LocalIo {
            message: message.into(),
        }
    }

    /// Whether a future trigger can recover from this error without
    /// external action. Authentication needs re-authorization first.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, SyncError::AuthenticationMissing)
    }
}
