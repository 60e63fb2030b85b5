//! Similarity query types and ranking.

use crate::score::cosine_similarity;
use crate::{CatalogRecord, IndexError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default similarity lower bound.
pub const DEFAULT_THRESHOLD: f32 = 0.5;

/// Default maximum number of results.
pub const DEFAULT_LIMIT: usize = 4;

/// Predicate over record metadata and the active flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataFilter {
    /// Required `is_active` value; `None` matches both.
    #[serde(default = "default_is_active")]
    pub is_active: Option<bool>,

    /// Metadata attributes that must be exactly equal.
    #[serde(default)]
    pub equals: HashMap<String, serde_json::Value>,
}

fn default_is_active() -> Option<bool> {
    Some(true)
}

impl Default for MetadataFilter {
    fn default() -> Self {
        Self {
            is_active: Some(true),
            equals: HashMap::new(),
        }
    }
}

impl MetadataFilter {
    /// Set the required active flag.
    pub fn with_active(mut self, active: bool) -> Self {
        self.is_active = Some(active);
        self
    }

    /// Match active and inactive records alike.
    pub fn include_inactive(mut self) -> Self {
        self.is_active = None;
        self
    }

    /// Require a metadata attribute to equal `value`.
    pub fn with_equals(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.equals.insert(key.into(), value);
        self
    }

    /// Whether `record` passes this predicate.
    pub fn matches(&self, record: &CatalogRecord) -> bool {
        if let Some(active) = self.is_active {
            if record.is_active != active {
                return false;
            }
        }

        self.equals
            .iter()
            .all(|(key, value)| record.metadata.get(key) == Some(value))
    }
}

/// A top-K nearest-neighbor query against the index.
#[derive(Debug, Clone)]
pub struct SimilarityQuery {
    /// Query vector; must match the index dimension.
    pub vector: Vec<f32>,

    /// Strict similarity lower bound.
    pub threshold: f32,

    /// Maximum number of results; must be at least 1.
    pub limit: usize,

    /// Metadata predicate applied before ranking.
    pub filter: MetadataFilter,
}

impl SimilarityQuery {
    /// Create a query with default threshold, limit, and filter.
    pub fn new(vector: Vec<f32>) -> Self {
        Self {
            vector,
            threshold: DEFAULT_THRESHOLD,
            limit: DEFAULT_LIMIT,
            filter: MetadataFilter::default(),
        }
    }

    /// Set the result limit.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Set the similarity threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the metadata filter.
    pub fn with_filter(mut self, filter: MetadataFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Validate query shape against the index dimension.
    pub fn validate(&self, dimension: usize) -> Result<()> {
        if self.limit == 0 {
            return Err(IndexError::InvalidQuery("limit must be at least 1".to_string()));
        }

        if self.vector.len() != dimension {
            return Err(IndexError::DimensionMismatch {
                expected: dimension,
                actual: self.vector.len(),
            });
        }

        Ok(())
    }
}

/// One ranked search hit.
#[derive(Debug, Clone)]
pub struct ScoredRecord {
    /// The matching record.
    pub record: CatalogRecord,

    /// Similarity to the query vector.
    pub score: f32,
}

/// Rank records against a query: filter, threshold, sort, limit.
///
/// Records without an embedding are always excluded, independent of the
/// filter. Ordering is fully deterministic: score descending, then id
/// ascending for equal scores, so repeated queries against unchanged data
/// return identical results.
pub fn rank<'a>(
    records: impl Iterator<Item = &'a CatalogRecord>,
    query: &SimilarityQuery,
) -> Vec<ScoredRecord> {
    let mut hits: Vec<ScoredRecord> = records
        .filter(|record| query.filter.matches(record))
        .filter_map(|record| {
            let embedding = record.embedding.as_ref()?;
            let score = cosine_similarity(&query.vector, embedding);
            (score > query.threshold).then(|| ScoredRecord {
                record: record.clone(),
                score,
            })
        })
        .collect();

    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.record.id.cmp(&b.record.id))
    });
    hits.truncate(query.limit);

    hits
}
