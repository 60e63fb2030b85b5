//! Vector similarity index over the product catalog.
//!
//! This crate provides:
//! - Catalog records with optional embeddings and metadata
//! - Threshold/filter/limit similarity queries with deterministic ordering
//! - In-memory and file-backed index implementations

pub mod error;
pub mod query;
pub mod score;
pub mod store;

pub use error::IndexError;
pub use query::{MetadataFilter, ScoredRecord, SimilarityQuery};
pub use score::cosine_similarity;
pub use store::{FileVectorIndex, MemoryVectorIndex, VectorIndex};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Result type for index operations.
pub type Result<T> = std::result::Result<T, IndexError>;

/// A catalog entry held by the index.
///
/// Immutable once ingested except for the `is_active` flag. `metadata` is
/// used only for filter predicates; `content` is the embedded unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogRecord {
    /// Unique stable identifier.
    pub id: i64,

    /// Display title.
    pub title: String,

    /// Display category.
    pub category: String,

    /// Free text used as the embedded unit.
    pub content: String,

    /// Structured attributes for filtering; never embedded.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,

    /// Embedding vector; `None` until computed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,

    /// Inactive records are excluded from retrieval by default.
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl CatalogRecord {
    /// Create a new active record without an embedding.
    pub fn new(id: i64, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            category: String::new(),
            content: content.into(),
            metadata: HashMap::new(),
            embedding: None,
            is_active: true,
        }
    }

    /// Set the category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Set the embedding.
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Add a metadata attribute.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Mark the record inactive.
    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}
