//! Engine error types, annotated with the turn stage that failed.

use shopchat_core::Source;
use shopchat_index::IndexError;
use shopchat_providers::ProviderError;
use shopchat_session::SessionError;
use std::fmt;
use thiserror::Error;

/// The step of a turn at which a failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStage {
    /// Loading history from the session store.
    HistoryLoad,

    /// Rewriting the message into a standalone query.
    Reformulation,

    /// Embedding the reformulated query.
    Embedding,

    /// Similarity search against the catalog index.
    Retrieval,

    /// Invoking the chat provider for the answer.
    Generation,

    /// Persisting the turn to the session store.
    Commit,

    /// Out-of-band session upkeep (reset, retention sweep).
    Maintenance,
}

impl fmt::Display for TurnStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TurnStage::HistoryLoad => "history load",
            TurnStage::Reformulation => "reformulation",
            TurnStage::Embedding => "embedding",
            TurnStage::Retrieval => "retrieval",
            TurnStage::Generation => "generation",
            TurnStage::Commit => "commit",
            TurnStage::Maintenance => "maintenance",
        };
        write!(f, "{}", name)
    }
}

/// Errors surfaced by the orchestrator.
///
/// Failures before the commit leave session history untouched, so retrying
/// the same turn is safe. `Commit` is the one distinct case: the caller has
/// an answer, but it may not be remembered next turn.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed input, rejected before any external call.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Embedding or generation provider failure.
    #[error("Provider error during {stage}: {source}")]
    Provider {
        stage: TurnStage,
        #[source]
        source: ProviderError,
    },

    /// Catalog index failure (infrastructure, not a transient model hiccup).
    #[error("Index error during retrieval: {0}")]
    Index(#[from] IndexError),

    /// Session store failure before any commit was attempted.
    #[error("Session store error during {stage}: {source}")]
    Store {
        stage: TurnStage,
        #[source]
        source: SessionError,
    },

    /// The answer was generated but committing it to history failed.
    #[error("Turn answered but commit failed: {source}")]
    Commit {
        /// The generated answer the caller did receive.
        answer: String,

        /// Provenance for that answer.
        sources: Vec<Source>,

        #[source]
        source: SessionError,
    },

    /// An external call exceeded its independent timeout.
    #[error("Timed out during {stage} after {secs}s")]
    Timeout { stage: TurnStage, secs: u64 },
}

impl EngineError {
    /// The stage at which the failure occurred, if it maps to one.
    pub fn stage(&self) -> Option<TurnStage> {
        match self {
            EngineError::Validation(_) => None,
            EngineError::Provider { stage, .. } => Some(*stage),
            EngineError::Index(_) => Some(TurnStage::Retrieval),
            EngineError::Store { stage, .. } => Some(*stage),
            EngineError::Commit { .. } => Some(TurnStage::Commit),
            EngineError::Timeout { stage, .. } => Some(*stage),
        }
    }

    /// Whether retrying the turn may succeed.
    ///
    /// Dimension mismatches and validation failures never are; provider
    /// failures follow the provider's own classification.
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::Validation(_) => false,
            EngineError::Provider { source, .. } => source.is_retryable(),
            EngineError::Index(IndexError::DimensionMismatch { .. }) => false,
            EngineError::Index(_) => true,
            EngineError::Store { .. } => true,
            EngineError::Commit { .. } => false,
            EngineError::Timeout { .. } => true,
        }
    }
}
