//! Vector index implementations.

use crate::query::{rank, ScoredRecord, SimilarityQuery};
use crate::{CatalogRecord, IndexError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::debug;

/// Trait for vector indexes over the catalog.
///
/// The read path (`search`) is side-effect free; the write path exists so
/// catalogs can be ingested and tests can seed records.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// The embedding dimension this index is configured for.
    fn dimension(&self) -> usize;

    /// Insert a record, replacing any record with the same id.
    async fn insert(&self, record: CatalogRecord) -> Result<()>;

    /// Insert multiple records.
    async fn insert_batch(&self, records: Vec<CatalogRecord>) -> Result<()>;

    /// Get a record by id.
    async fn get(&self, id: i64) -> Result<Option<CatalogRecord>>;

    /// Delete a record by id.
    async fn delete(&self, id: i64) -> Result<()>;

    /// Top-K nearest records by cosine similarity.
    async fn search(&self, query: &SimilarityQuery) -> Result<Vec<ScoredRecord>>;

    /// Count records.
    async fn count(&self) -> Result<usize>;

    /// Remove all records.
    async fn clear(&self) -> Result<()>;

    /// Verify the backing storage is reachable without running a query.
    async fn ping(&self) -> Result<()>;
}

fn check_record_dimension(record: &CatalogRecord, dimension: usize) -> Result<()> {
    if let Some(embedding) = &record.embedding {
        if embedding.len() != dimension {
            return Err(IndexError::DimensionMismatch {
                expected: dimension,
                actual: embedding.len(),
            });
        }
    }
    Ok(())
}

/// In-memory vector index.
pub struct MemoryVectorIndex {
    dimension: usize,
    records: RwLock<HashMap<i64, CatalogRecord>>,
}

impl MemoryVectorIndex {
    /// Create a new in-memory index for the given embedding dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            records: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl VectorIndex for MemoryVectorIndex {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn insert(&self, record: CatalogRecord) -> Result<()> {
        check_record_dimension(&record, self.dimension)?;
        let mut records = self.records.write().await;
        records.insert(record.id, record);
        Ok(())
    }

    async fn insert_batch(&self, batch: Vec<CatalogRecord>) -> Result<()> {
        for record in &batch {
            check_record_dimension(record, self.dimension)?;
        }
        let mut records = self.records.write().await;
        for record in batch {
            records.insert(record.id, record);
        }
        Ok(())
    }

    async fn get(&self, id: i64) -> Result<Option<CatalogRecord>> {
        let records = self.records.read().await;
        Ok(records.get(&id).cloned())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let mut records = self.records.write().await;
        records.remove(&id);
        Ok(())
    }

    async fn search(&self, query: &SimilarityQuery) -> Result<Vec<ScoredRecord>> {
        query.validate(self.dimension)?;
        let records = self.records.read().await;
        Ok(rank(records.values(), query))
    }

    async fn count(&self) -> Result<usize> {
        let records = self.records.read().await;
        Ok(records.len())
    }

    async fn clear(&self) -> Result<()> {
        let mut records = self.records.write().await;
        records.clear();
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// File-backed vector index with JSON persistence.
///
/// All mutations are persisted via atomic writes (write to tmp, then
/// rename). This is the slow-path fallback for deployments without a store
/// that ranks vectors natively: every search scans the whole catalog in
/// memory.
pub struct FileVectorIndex {
    dimension: usize,
    path: PathBuf,
    records: RwLock<HashMap<i64, CatalogRecord>>,
}

impl FileVectorIndex {
    /// Open or create a file-backed index.
    ///
    /// If the file at `path` exists, its contents are deserialized into
    /// memory; every loaded embedding must match `dimension`.
    pub fn new(path: PathBuf, dimension: usize) -> Result<Self> {
        let records: HashMap<i64, CatalogRecord> = if path.exists() {
            let data = std::fs::read_to_string(&path)?;
            serde_json::from_str(&data)?
        } else {
            HashMap::new()
        };

        for record in records.values() {
            check_record_dimension(record, dimension)?;
        }

        Ok(Self {
            dimension,
            path,
            records: RwLock::new(records),
        })
    }

    /// Atomically persist the current records to disk.
    fn save(&self, records: &HashMap<i64, CatalogRecord>) -> Result<()> {
        let tmp_path = self.path.with_extension("tmp");
        let data = serde_json::to_string(records)?;
        std::fs::write(&tmp_path, data)?;
        std::fs::rename(&tmp_path, &self.path)?;
        debug!(path = %self.path.display(), count = records.len(), "Saved catalog index");
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for FileVectorIndex {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn insert(&self, record: CatalogRecord) -> Result<()> {
        check_record_dimension(&record, self.dimension)?;
        let mut records = self.records.write().await;
        records.insert(record.id, record);
        self.save(&records)?;
        Ok(())
    }

    async fn insert_batch(&self, batch: Vec<CatalogRecord>) -> Result<()> {
        for record in &batch {
            check_record_dimension(record, self.dimension)?;
        }
        let mut records = self.records.write().await;
        for record in batch {
            records.insert(record.id, record);
        }
        self.save(&records)?;
        Ok(())
    }

    async fn get(&self, id: i64) -> Result<Option<CatalogRecord>> {
        let records = self.records.read().await;
        Ok(records.get(&id).cloned())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let mut records = self.records.write().await;
        records.remove(&id);
        self.save(&records)?;
        Ok(())
    }

    async fn search(&self, query: &SimilarityQuery) -> Result<Vec<ScoredRecord>> {
        query.validate(self.dimension)?;
        let records = self.records.read().await;
        Ok(rank(records.values(), query))
    }

    async fn count(&self) -> Result<usize> {
        let records = self.records.read().await;
        Ok(records.len())
    }

    async fn clear(&self) -> Result<()> {
        let mut records = self.records.write().await;
        records.clear();
        self.save(&records)?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let parent = self.path.parent().unwrap_or_else(|| std::path::Path::new("."));
        if parent.exists() {
            Ok(())
        } else {
            Err(IndexError::Unavailable(format!(
                "index directory missing: {}",
                parent.display()
            )))
        }
    }
}
