//! Text-level memory facade for simulated agents.

use crate::error::MemoryError;
use crate::model::{MemoryId, MemoryRecord};
use crate::provider::EmbeddingProvider;
use crate::reflection::ReflectionTracker;
use crate::scoring::ScoreWeights;
use crate::stream::MemoryStream;
use chrono::{DateTime, Utc};
use log::{debug, info};
use std::sync::Arc;

const DEFAULT_RECALL_K: usize = 4;

/// Result of storing an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RememberOutcome {
    /// Id of the stored memory.
    pub id: MemoryId,
    /// Accumulated importance crossed the reflection threshold.
    pub should_reflect: bool,
}

/// Embeds text through an injected provider and stores or recalls it from a
/// memory stream.
pub struct AgentMemory {
    stream: Arc<dyn MemoryStream>,
    embedder: Arc<dyn EmbeddingProvider>,
    reflection: ReflectionTracker,
    weights: ScoreWeights,
    default_k: usize,
}

impl AgentMemory {
    /// Create an agent memory with default weights and no reflection threshold.
    pub fn new(stream: Arc<dyn MemoryStream>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            stream,
            embedder,
            reflection: ReflectionTracker::new(None),
            weights: ScoreWeights::default(),
            default_k: DEFAULT_RECALL_K,
        }
    }

    /// Override ranking weights.
    pub fn with_weights(mut self, weights: ScoreWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Override the number of memories returned by [`AgentMemory::recall`].
    pub fn with_default_k(mut self, k: usize) -> Self {
        self.default_k = k;
        self
    }

    /// Signal reflection once accumulated importance exceeds `threshold`.
    pub fn with_reflection_threshold(mut self, threshold: Option<f64>) -> Self {
        self.reflection = ReflectionTracker::new(threshold);
        self
    }

    /// Underlying memory stream.
    pub fn stream(&self) -> &Arc<dyn MemoryStream> {
        &self.stream
    }

    /// Reflection accumulator.
    pub fn reflection(&self) -> &ReflectionTracker {
        &self.reflection
    }

    /// Embed and store an observation.
    pub async fn remember(
        &self,
        text: impl Into<String>,
        importance: f64,
        now: DateTime<Utc>,
    ) -> Result<RememberOutcome, MemoryError> {
        let text = text.into();
        let embedding = self
            .embedder
            .embed(&text)
            .await
            .map_err(MemoryError::UpstreamFailure)?;
        let id = self.stream.add(text, embedding, importance, now).await?;
        let should_reflect = self.reflection.record(importance);
        if should_reflect {
            info!("reflection threshold reached (id={id})");
        }
        Ok(RememberOutcome { id, should_reflect })
    }

    /// Embed a query and select the `k` best memories.
    pub async fn fetch(
        &self,
        query: &str,
        now: DateTime<Utc>,
        k: usize,
    ) -> Result<Vec<MemoryRecord>, MemoryError> {
        let embedding = self
            .embedder
            .embed(query)
            .await
            .map_err(MemoryError::UpstreamFailure)?;
        self.stream.select(&embedding, now, k, &self.weights).await
    }

    /// Like [`AgentMemory::fetch`] with the default `k`; an empty store
    /// yields no memories instead of an error.
    pub async fn recall(
        &self,
        query: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<MemoryRecord>, MemoryError> {
        match self.fetch(query, now, self.default_k).await {
            Err(MemoryError::EmptyStore) => {
                debug!("recall on empty memory stream");
                Ok(Vec::new())
            }
            other => other,
        }
    }

    /// Render memories as prompt lines, keeping whole lines within `max_chars`.
    pub fn format_memories(records: &[MemoryRecord], max_chars: Option<usize>) -> String {
        let mut lines = Vec::new();
        let mut used = 0usize;
        for record in records {
            let line = format!(
                "- [{}] {}",
                record.created_at.format("%Y-%m-%d %H:%M"),
                record.text.trim()
            );
            let len = line.chars().count() + usize::from(!lines.is_empty());
            if let Some(max_chars) = max_chars
                && used + len > max_chars
            {
                break;
            }
            used += len;
            lines.push(line);
        }
        lines.join("\n")
    }
}
