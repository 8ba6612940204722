//! Memory stream interface and the time-weighted implementation.

use crate::error::MemoryError;
use crate::model::{MemoryId, MemoryRecord};
use crate::scoring::{ScoreWeights, ScoredMemory, ScoringPolicy};
use crate::store::MemoryRecordStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[async_trait]
/// Backend-agnostic memory stream used by agents.
pub trait MemoryStream: Send + Sync {
    /// Store a new memory.
    async fn add(
        &self,
        text: String,
        embedding: Vec<f32>,
        importance: f64,
        now: DateTime<Utc>,
    ) -> Result<MemoryId, MemoryError>;

    /// Fetch a memory by id.
    async fn get(&self, id: MemoryId) -> Result<MemoryRecord, MemoryError>;

    /// Mark a memory as accessed.
    async fn touch(&self, id: MemoryId, now: DateTime<Utc>) -> Result<(), MemoryError>;

    /// Select the `k` best memories for a query embedding.
    async fn select(
        &self,
        query_embedding: &[f32],
        now: DateTime<Utc>,
        k: usize,
        weights: &ScoreWeights,
    ) -> Result<Vec<MemoryRecord>, MemoryError>;

    /// The `n` most recently created memories, newest first.
    async fn recent(&self, n: usize) -> Result<Vec<MemoryRecord>, MemoryError>;
}

/// Memory stream ranking a record store with a [`ScoringPolicy`].
#[derive(Clone)]
pub struct TimeWeightedMemory {
    store: Arc<MemoryRecordStore>,
    policy: ScoringPolicy,
}

impl TimeWeightedMemory {
    /// Combine a store and a scoring policy.
    pub fn new(store: Arc<MemoryRecordStore>, policy: ScoringPolicy) -> Self {
        Self { store, policy }
    }

    /// Shared handle to the underlying store.
    pub fn store(&self) -> &Arc<MemoryRecordStore> {
        &self.store
    }

    /// Scoring policy in use.
    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    /// Select with per-signal scores attached.
    pub async fn select_scored(
        &self,
        query_embedding: &[f32],
        now: DateTime<Utc>,
        k: usize,
        weights: &ScoreWeights,
    ) -> Result<Vec<ScoredMemory>, MemoryError> {
        self.policy
            .select_scored(&self.store, query_embedding, now, k, weights)
            .await
    }
}

#[async_trait]
impl MemoryStream for TimeWeightedMemory {
    async fn add(
        &self,
        text: String,
        embedding: Vec<f32>,
        importance: f64,
        now: DateTime<Utc>,
    ) -> Result<MemoryId, MemoryError> {
        self.store.add(text, embedding, importance, now).await
    }

    async fn get(&self, id: MemoryId) -> Result<MemoryRecord, MemoryError> {
        self.store.get(id)
    }

    async fn touch(&self, id: MemoryId, now: DateTime<Utc>) -> Result<(), MemoryError> {
        self.store.touch(id, now)
    }

    async fn select(
        &self,
        query_embedding: &[f32],
        now: DateTime<Utc>,
        k: usize,
        weights: &ScoreWeights,
    ) -> Result<Vec<MemoryRecord>, MemoryError> {
        self.policy
            .select(&self.store, query_embedding, now, k, weights)
            .await
    }

    async fn recent(&self, n: usize) -> Result<Vec<MemoryRecord>, MemoryError> {
        Ok(self.store.recent(n))
    }
}
