//! Provider error taxonomy.
//!
//! Both capability traits fail with [`ProviderError`]; the orchestrator
//! decides what to do based on [`ProviderError::is_retryable`] and, for
//! rate limits, the server-supplied backoff hint.

use thiserror::Error;

/// Result type for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Failure modes of the embedding and generation backends.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The API rejected our credentials.
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Throttled by the backend; `retry_after` echoes the response header
    /// when one was sent.
    #[error("Rate limit exceeded: {message}. Retry after {retry_after:?} seconds")]
    RateLimit {
        message: String,
        retry_after: Option<u64>,
    },

    /// The backend rejected the request body.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The requested model does not exist or is not enabled for this key.
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// 5xx from the backend.
    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    /// Transport-level failure.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The call exceeded its deadline.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Malformed request or response payload.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Provider misconfigured (missing key, bad base URL).
    #[error("Configuration error: {0}")]
    Config(String),

    /// A contract violation on our side, such as an empty response body.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProviderError {
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Authentication(message.into())
    }

    pub fn rate_limit(message: impl Into<String>, retry_after: Option<u64>) -> Self {
        Self::RateLimit {
            message: message.into(),
            retry_after,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn server_error(status: u16, message: impl Into<String>) -> Self {
        Self::ServerError {
            status,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether the same call could plausibly succeed if repeated.
    ///
    /// Auth, validation, and model errors are deterministic and never
    /// worth repeating.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimit { .. } | Self::Timeout(_) | Self::Network(_) => true,
            Self::ServerError { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Server-mandated backoff in seconds, if the backend sent one.
    ///
    /// Only rate-limit responses carry an authoritative delay; for every
    /// other retryable failure the caller picks its own backoff.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Self::RateLimit { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}
