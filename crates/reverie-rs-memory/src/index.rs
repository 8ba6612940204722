//! Brute-force cosine similarity index kept in process.

use crate::error::UpstreamError;
use crate::model::MemoryId;
use crate::provider::SimilarityIndex;
use async_trait::async_trait;
use log::debug;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Exact nearest-neighbour index over all inserted vectors.
///
/// Cosine similarity is mapped from `[-1, 1]` onto `[0, 1]`.
#[derive(Debug, Default)]
pub struct InMemorySimilarityIndex {
    vectors: RwLock<BTreeMap<MemoryId, Vec<f32>>>,
}

impl InMemorySimilarityIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of indexed vectors.
    pub fn len(&self) -> usize {
        self.vectors.read().len()
    }

    /// Whether the index holds no vectors.
    pub fn is_empty(&self) -> bool {
        self.vectors.read().is_empty()
    }
}

#[async_trait]
impl SimilarityIndex for InMemorySimilarityIndex {
    async fn insert(&self, id: MemoryId, vector: Vec<f32>) -> Result<(), UpstreamError> {
        self.vectors.write().insert(id, vector);
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<(MemoryId, f32)>, UpstreamError> {
        let mut scored: Vec<(MemoryId, f32)> = self
            .vectors
            .read()
            .iter()
            .map(|(id, candidate)| (*id, normalized_cosine(vector, candidate)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(limit);
        debug!(
            "index query (limit={}, returned={})",
            limit,
            scored.len()
        );
        Ok(scored)
    }
}

/// Cosine similarity rescaled to `[0, 1]`; zero vectors score `0.5`.
pub fn normalized_cosine(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.5;
    }
    let cosine = (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0);
    ((cosine + 1.0) / 2.0) as f32
}

#[cfg(test)]
mod tests {
    use super::{InMemorySimilarityIndex, normalized_cosine};
    use crate::model::MemoryId;
    use crate::provider::SimilarityIndex;
    use pretty_assertions::assert_eq;

    #[test]
    fn normalized_cosine_maps_range() {
        assert_eq!(normalized_cosine(&[1.0, 0.0], &[2.0, 0.0]), 1.0);
        assert_eq!(normalized_cosine(&[1.0, 0.0], &[-1.0, 0.0]), 0.0);
        assert_eq!(normalized_cosine(&[1.0, 0.0], &[0.0, 1.0]), 0.5);
        assert_eq!(normalized_cosine(&[0.0, 0.0], &[0.0, 1.0]), 0.5);
    }

    #[tokio::test]
    async fn query_orders_by_similarity_and_limits() {
        let index = InMemorySimilarityIndex::new();
        index.insert(MemoryId(1), vec![0.0, 1.0]).await.expect("insert");
        index.insert(MemoryId(2), vec![1.0, 0.0]).await.expect("insert");
        index.insert(MemoryId(3), vec![1.0, 1.0]).await.expect("insert");

        let hits = index.query(&[1.0, 0.0], 2).await.expect("query");
        let ids: Vec<MemoryId> = hits.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![MemoryId(2), MemoryId(3)]);
        assert_eq!(index.len(), 3);
    }
}
