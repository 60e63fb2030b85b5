//! Durable conversation session storage.
//!
//! A [`Session`] is an identified, ordered message history that survives
//! across stateless request handling. Stores serialize writes per session so
//! concurrent turns never corrupt a history, while sessions with different
//! identifiers proceed fully in parallel.

pub mod error;
pub mod store;

pub use error::SessionError;
pub use store::{FileSessionStore, MemorySessionStore, SessionStore};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shopchat_core::{ChatMessage, SessionId};

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;

/// A durable conversation session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Session identifier.
    pub id: SessionId,

    /// Messages in strictly chronological order.
    pub messages: Vec<ChatMessage>,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create a new, empty session.
    pub fn new(id: SessionId) -> Self {
        let now = Utc::now();
        Self {
            id,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Number of messages in the history.
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Whether the session has no history yet.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
