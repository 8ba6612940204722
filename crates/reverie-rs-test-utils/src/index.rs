use async_trait::async_trait;
use parking_lot::Mutex;
use reverie_rs_memory::{MemoryId, SimilarityIndex, UpstreamError};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Index that ignores vectors and reports a scripted similarity per id.
#[derive(Debug)]
pub struct ScriptedIndex {
    default_similarity: f32,
    similarities: Mutex<BTreeMap<MemoryId, f32>>,
    inserted: Mutex<Vec<MemoryId>>,
}

impl ScriptedIndex {
    pub fn new(default_similarity: f32) -> Self {
        Self {
            default_similarity,
            similarities: Mutex::new(BTreeMap::new()),
            inserted: Mutex::new(Vec::new()),
        }
    }

    pub fn set_similarity(&self, id: MemoryId, similarity: f32) {
        self.similarities.lock().insert(id, similarity);
    }

    pub fn inserted(&self) -> Vec<MemoryId> {
        self.inserted.lock().clone()
    }
}

#[async_trait]
impl SimilarityIndex for ScriptedIndex {
    async fn insert(&self, id: MemoryId, _vector: Vec<f32>) -> Result<(), UpstreamError> {
        self.inserted.lock().push(id);
        Ok(())
    }

    async fn query(
        &self,
        _vector: &[f32],
        limit: usize,
    ) -> Result<Vec<(MemoryId, f32)>, UpstreamError> {
        let similarities = self.similarities.lock();
        let mut hits: Vec<(MemoryId, f32)> = self
            .inserted
            .lock()
            .iter()
            .map(|id| {
                let similarity = similarities
                    .get(id)
                    .copied()
                    .unwrap_or(self.default_similarity);
                (*id, similarity)
            })
            .collect();
        hits.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        hits.truncate(limit);
        Ok(hits)
    }
}

/// Returns every hit of the wrapped index several times.
pub struct DuplicatingIndex {
    inner: Arc<dyn SimilarityIndex>,
    copies: usize,
}

impl DuplicatingIndex {
    pub fn new(inner: Arc<dyn SimilarityIndex>, copies: usize) -> Self {
        Self { inner, copies }
    }
}

#[async_trait]
impl SimilarityIndex for DuplicatingIndex {
    async fn insert(&self, id: MemoryId, vector: Vec<f32>) -> Result<(), UpstreamError> {
        self.inner.insert(id, vector).await
    }

    async fn query(
        &self,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<(MemoryId, f32)>, UpstreamError> {
        let hits = self.inner.query(vector, limit).await?;
        Ok(hits
            .into_iter()
            .flat_map(|hit| std::iter::repeat_n(hit, self.copies))
            .collect())
    }
}

/// Index whose inserts or queries fail on demand.
#[derive(Debug, Default)]
pub struct FailingIndex {
    fail_insert: bool,
    fail_query: bool,
    inserted: Mutex<Vec<MemoryId>>,
}

impl FailingIndex {
    pub fn failing_inserts() -> Self {
        Self {
            fail_insert: true,
            ..Self::default()
        }
    }

    pub fn failing_queries() -> Self {
        Self {
            fail_query: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl SimilarityIndex for FailingIndex {
    async fn insert(&self, id: MemoryId, _vector: Vec<f32>) -> Result<(), UpstreamError> {
        if self.fail_insert {
            return Err("index insert unavailable".into());
        }
        self.inserted.lock().push(id);
        Ok(())
    }

    async fn query(
        &self,
        _vector: &[f32],
        limit: usize,
    ) -> Result<Vec<(MemoryId, f32)>, UpstreamError> {
        if self.fail_query {
            return Err("index query unavailable".into());
        }
        Ok(self
            .inserted
            .lock()
            .iter()
            .take(limit)
            .map(|id| (*id, 1.0))
            .collect())
    }
}

/// Index whose queries never complete.
#[derive(Debug, Default)]
pub struct PendingIndex {
    inserted: Mutex<Vec<MemoryId>>,
}

#[async_trait]
impl SimilarityIndex for PendingIndex {
    async fn insert(&self, id: MemoryId, _vector: Vec<f32>) -> Result<(), UpstreamError> {
        self.inserted.lock().push(id);
        Ok(())
    }

    async fn query(
        &self,
        _vector: &[f32],
        _limit: usize,
    ) -> Result<Vec<(MemoryId, f32)>, UpstreamError> {
        std::future::pending().await
    }
}
