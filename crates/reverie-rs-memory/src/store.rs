//! Insert-only record store backed by an injected similarity index.

use crate::error::MemoryError;
use crate::model::{MemoryId, MemoryRecord};
use crate::provider::SimilarityIndex;
use crate::snapshot;
use chrono::{DateTime, Utc};
use log::{debug, info};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Shape constraints enforced on every stored record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoreConfig {
    /// Required embedding length.
    pub dimensions: usize,
    /// Lowest accepted importance.
    pub min_importance: f64,
    /// Highest accepted importance.
    pub max_importance: f64,
}

impl Default for StoreConfig {
    /// Default store settings (384-dim embeddings, importance 1-10).
    fn default() -> Self {
        Self {
            dimensions: 384,
            min_importance: 1.0,
            max_importance: 10.0,
        }
    }
}

impl StoreConfig {
    /// Check that the bounds describe a usable store.
    pub fn validate(&self) -> Result<(), MemoryError> {
        if self.dimensions == 0 {
            return Err(MemoryError::invalid("dimensions must be positive"));
        }
        if !self.min_importance.is_finite() || !self.max_importance.is_finite() {
            return Err(MemoryError::invalid("importance bounds must be finite"));
        }
        if self.max_importance <= 0.0 || self.min_importance > self.max_importance {
            return Err(MemoryError::invalid(format!(
                "invalid importance bounds [{}, {}]",
                self.min_importance, self.max_importance
            )));
        }
        Ok(())
    }
}

/// Owns all memory records. Callers get clones; `touch` is the only mutation.
pub struct MemoryRecordStore {
    config: StoreConfig,
    index: Arc<dyn SimilarityIndex>,
    records: RwLock<BTreeMap<MemoryId, MemoryRecord>>,
    next_id: AtomicU64,
}

impl MemoryRecordStore {
    /// Create an empty store over the given similarity index.
    pub fn new(config: StoreConfig, index: Arc<dyn SimilarityIndex>) -> Result<Self, MemoryError> {
        config.validate()?;
        info!(
            "initialized memory record store (dimensions={}, importance=[{}, {}])",
            config.dimensions, config.min_importance, config.max_importance
        );
        Ok(Self {
            config,
            index,
            records: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        })
    }

    /// Rebuild a store from previously captured records.
    ///
    /// Every vector is re-inserted into `index`; ids and access times are kept
    /// and new ids continue after the highest restored one. Nothing reaches
    /// `index` unless every record is valid.
    pub async fn restore(
        config: StoreConfig,
        index: Arc<dyn SimilarityIndex>,
        records: Vec<MemoryRecord>,
    ) -> Result<Self, MemoryError> {
        let store = Self::new(config, index)?;
        let mut restored = BTreeMap::new();
        for record in records {
            store.validate_embedding(&record.embedding)?;
            store.validate_importance(record.importance)?;
            if record.last_accessed_at < record.created_at {
                return Err(MemoryError::invalid(format!(
                    "{} was accessed before it was created",
                    record.id
                )));
            }
            if restored.contains_key(&record.id) {
                return Err(MemoryError::invalid(format!("duplicate id {}", record.id)));
            }
            restored.insert(record.id, record);
        }
        for record in restored.values() {
            store
                .index
                .insert(record.id, record.embedding.clone())
                .await
                .map_err(MemoryError::UpstreamFailure)?;
        }
        let next = restored.keys().next_back().map_or(1, |id| id.0 + 1);
        store.next_id.store(next, Ordering::SeqCst);
        info!("restored memory records (count={})", restored.len());
        *store.records.write() = restored;
        Ok(store)
    }

    /// Load a JSONL snapshot written by [`MemoryRecordStore::save_snapshot`].
    pub async fn load_snapshot(
        path: impl AsRef<Path>,
        config: StoreConfig,
        index: Arc<dyn SimilarityIndex>,
    ) -> Result<Self, MemoryError> {
        let records = snapshot::read_records(path.as_ref())?;
        Self::restore(config, index, records).await
    }

    /// Write every record to a JSONL snapshot, replacing the file atomically.
    pub fn save_snapshot(&self, path: impl AsRef<Path>) -> Result<(), MemoryError> {
        let records = self.records();
        snapshot::write_records(path.as_ref(), &records)
    }

    /// Store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Create and store a new record, returning its id.
    pub async fn add(
        &self,
        text: impl Into<String>,
        embedding: Vec<f32>,
        importance: f64,
        now: DateTime<Utc>,
    ) -> Result<MemoryId, MemoryError> {
        self.validate_embedding(&embedding)?;
        self.validate_importance(importance)?;
        let id = MemoryId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.index
            .insert(id, embedding.clone())
            .await
            .map_err(MemoryError::UpstreamFailure)?;
        let record = MemoryRecord {
            id,
            text: text.into(),
            embedding,
            created_at: now,
            last_accessed_at: now,
            importance,
        };
        debug!(
            "stored memory record (id={}, importance={}, text_len={})",
            id,
            importance,
            record.text.len()
        );
        self.records.write().insert(id, record);
        Ok(id)
    }

    /// Fetch a copy of a record.
    pub fn get(&self, id: MemoryId) -> Result<MemoryRecord, MemoryError> {
        self.records
            .read()
            .get(&id)
            .cloned()
            .ok_or(MemoryError::NotFound(id))
    }

    /// Mark a record as accessed at `now`.
    pub fn touch(&self, id: MemoryId, now: DateTime<Utc>) -> Result<(), MemoryError> {
        let mut records = self.records.write();
        let record = records.get_mut(&id).ok_or(MemoryError::NotFound(id))?;
        mark_accessed(record, now);
        Ok(())
    }

    /// Mark several records as accessed under one lock acquisition and
    /// return their updated copies in the order given.
    ///
    /// Either every id is touched or, if any id is unknown, none are.
    pub(crate) fn touch_all(
        &self,
        ids: &[MemoryId],
        now: DateTime<Utc>,
    ) -> Result<Vec<MemoryRecord>, MemoryError> {
        let mut records = self.records.write();
        if let Some(missing) = ids.iter().find(|id| !records.contains_key(*id)) {
            return Err(MemoryError::NotFound(*missing));
        }
        let mut touched = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = records.get_mut(id) {
                mark_accessed(record, now);
                touched.push(record.clone());
            }
        }
        Ok(touched)
    }

    /// Query the index and pair each hit with its record.
    ///
    /// Similarities are clamped to `[0, 1]`. Ids unknown to the store are
    /// skipped.
    pub async fn all_candidates(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<(MemoryRecord, f32)>, MemoryError> {
        self.validate_embedding(query_embedding)?;
        let hits = self
            .index
            .query(query_embedding, limit)
            .await
            .map_err(MemoryError::UpstreamFailure)?;
        let records = self.records.read();
        let mut candidates = Vec::with_capacity(hits.len());
        for (id, similarity) in hits {
            match records.get(&id) {
                Some(record) => candidates.push((record.clone(), clamp_similarity(similarity))),
                None => debug!("index returned unknown record (id={id})"),
            }
        }
        Ok(candidates)
    }

    /// The `n` most recently created records, newest first.
    pub fn recent(&self, n: usize) -> Vec<MemoryRecord> {
        let mut records = self.records();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        records.truncate(n);
        records
    }

    /// Copies of all records in id order.
    pub fn records(&self) -> Vec<MemoryRecord> {
        self.records.read().values().cloned().collect()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Reject embeddings of the wrong length or with non-finite components.
    pub(crate) fn validate_embedding(&self, embedding: &[f32]) -> Result<(), MemoryError> {
        if embedding.len() != self.config.dimensions {
            return Err(MemoryError::invalid(format!(
                "embedding has {} dimensions, expected {}",
                embedding.len(),
                self.config.dimensions
            )));
        }
        if embedding.iter().any(|value| !value.is_finite()) {
            return Err(MemoryError::invalid("embedding contains non-finite values"));
        }
        Ok(())
    }

    fn validate_importance(&self, importance: f64) -> Result<(), MemoryError> {
        if !importance.is_finite()
            || importance < self.config.min_importance
            || importance > self.config.max_importance
        {
            return Err(MemoryError::invalid(format!(
                "importance {importance} outside [{}, {}]",
                self.config.min_importance, self.config.max_importance
            )));
        }
        Ok(())
    }
}

/// Latest wall-clock access wins; earlier timestamps leave the record as is.
fn mark_accessed(record: &mut MemoryRecord, now: DateTime<Utc>) {
    if now > record.last_accessed_at {
        record.last_accessed_at = now;
    }
}

fn clamp_similarity(similarity: f32) -> f32 {
    if similarity.is_nan() {
        0.0
    } else {
        similarity.clamp(0.0, 1.0)
    }
}
