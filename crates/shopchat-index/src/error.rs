//! Index error types.

use thiserror::Error;

/// Errors that can occur during index operations.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Query or record vector length does not match the index dimension.
    ///
    /// This indicates the embedding model changed without reindexing. It is
    /// never retryable.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Malformed query parameters.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Underlying storage unreachable.
    #[error("Index unavailable: {0}")]
    Unavailable(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
