use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use reverie_rs_memory::{MemoryError, MemoryId, MemoryRecord, MemoryStream, ScoreWeights};
use std::sync::Arc;

/// A `select` call seen by [`StubStream`].
#[derive(Debug, Clone, PartialEq)]
pub struct SelectCall {
    pub query_embedding: Vec<f32>,
    pub now: DateTime<Utc>,
    pub k: usize,
}

/// Memory stream that keeps added records in a list and answers `select`
/// with a fixed result.
#[derive(Clone, Default)]
pub struct StubStream {
    records: Arc<Mutex<Vec<MemoryRecord>>>,
    selections: Arc<Mutex<Vec<SelectCall>>>,
    select_empty_store: bool,
    select_result: Vec<MemoryRecord>,
}

impl StubStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_selection(select_result: Vec<MemoryRecord>) -> Self {
        Self {
            select_result,
            ..Self::default()
        }
    }

    /// `select` fails with `EmptyStore`.
    pub fn empty() -> Self {
        Self {
            select_empty_store: true,
            ..Self::default()
        }
    }

    pub fn records(&self) -> Vec<MemoryRecord> {
        self.records.lock().clone()
    }

    pub fn selections(&self) -> Vec<SelectCall> {
        self.selections.lock().clone()
    }
}

#[async_trait]
impl MemoryStream for StubStream {
    async fn add(
        &self,
        text: String,
        embedding: Vec<f32>,
        importance: f64,
        now: DateTime<Utc>,
    ) -> Result<MemoryId, MemoryError> {
        let mut records = self.records.lock();
        let id = MemoryId(records.len() as u64 + 1);
        records.push(MemoryRecord {
            id,
            text,
            embedding,
            created_at: now,
            last_accessed_at: now,
            importance,
        });
        Ok(id)
    }

    async fn get(&self, id: MemoryId) -> Result<MemoryRecord, MemoryError> {
        self.records
            .lock()
            .iter()
            .find(|record| record.id == id)
            .cloned()
            .ok_or(MemoryError::NotFound(id))
    }

    async fn touch(&self, id: MemoryId, _now: DateTime<Utc>) -> Result<(), MemoryError> {
        self.get(id).await.map(|_| ())
    }

    async fn select(
        &self,
        query_embedding: &[f32],
        now: DateTime<Utc>,
        k: usize,
        _weights: &ScoreWeights,
    ) -> Result<Vec<MemoryRecord>, MemoryError> {
        self.selections.lock().push(SelectCall {
            query_embedding: query_embedding.to_vec(),
            now,
            k,
        });
        if self.select_empty_store {
            return Err(MemoryError::EmptyStore);
        }
        Ok(self.select_result.iter().take(k).cloned().collect())
    }

    async fn recent(&self, n: usize) -> Result<Vec<MemoryRecord>, MemoryError> {
        let mut records = self.records();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        records.truncate(n);
        Ok(records)
    }
}
