//! Retrieval-augmented conversation orchestrator.
//!
//! The engine composes four collaborators - embedding provider, chat
//! provider, vector index, and session store - into a stateless per-turn
//! pipeline: load history, reformulate the query, retrieve supporting
//! records, generate an answer, and commit the turn to the session.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use shopchat_core::EngineConfig;
//! use shopchat_engine::{Orchestrator, TurnParameters};
//!
//! let engine = Orchestrator::new(config, embeddings, chat, index, sessions);
//! let reply = engine
//!     .handle_turn(None, "What products do you have?", TurnParameters::default())
//!     .await?;
//! println!("{} (sources: {})", reply.answer, reply.sources.len());
//! ```

pub mod error;
pub mod orchestrator;
pub mod params;
pub mod prompt;

pub use error::{EngineError, TurnStage};
pub use orchestrator::{Health, Orchestrator, TurnReply};
pub use params::TurnParameters;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
