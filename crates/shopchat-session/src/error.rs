//! Session store error types.

use thiserror::Error;

/// Errors that can occur during session store operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Underlying storage unreachable.
    #[error("Session store unavailable: {0}")]
    Unavailable(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
