//! Build memory components from a loaded [`ReverieConfig`].

use log::info;
use reverie_rs_config::{MemoryConfig, ReverieConfig};
use reverie_rs_memory::{
    AgentMemory, EmbeddingProvider, MemoryError, MemoryRecordStore, ScoreWeights, ScoringPolicy,
    SimilarityIndex, StoreConfig, TimeWeightedMemory,
};
use std::sync::Arc;

/// Store bounds from the memory config.
pub fn store_config(memory: &MemoryConfig) -> StoreConfig {
    StoreConfig {
        dimensions: memory.dimensions,
        min_importance: memory.min_importance,
        max_importance: memory.max_importance,
    }
}

/// Ranking weights from the memory config.
pub fn score_weights(memory: &MemoryConfig) -> ScoreWeights {
    ScoreWeights {
        similarity: memory.weights.similarity,
        recency: memory.weights.recency,
        importance: memory.weights.importance,
    }
}

/// Scoring policy from the memory config.
pub fn scoring_policy(memory: &MemoryConfig) -> Result<ScoringPolicy, MemoryError> {
    ScoringPolicy::new(memory.decay_rate, memory.overfetch_factor)
}

/// Open the time-weighted memory stream.
///
/// When `snapshot_path` is set the store is restored from it, re-inserting
/// every vector into `index`; otherwise the store starts empty.
pub async fn open_stream(
    config: &ReverieConfig,
    index: Arc<dyn SimilarityIndex>,
) -> Result<Arc<TimeWeightedMemory>, MemoryError> {
    let memory = &config.memory;
    let store = match memory.snapshot_path.as_ref() {
        Some(path) => {
            info!("opening memory snapshot (path={})", path.display());
            MemoryRecordStore::load_snapshot(path, store_config(memory), index).await?
        }
        None => MemoryRecordStore::new(store_config(memory), index)?,
    };
    Ok(Arc::new(TimeWeightedMemory::new(
        Arc::new(store),
        scoring_policy(memory)?,
    )))
}

/// Wrap a stream in an [`AgentMemory`] using the configured weights, recall
/// size and reflection threshold.
pub fn agent_memory(
    config: &ReverieConfig,
    stream: Arc<TimeWeightedMemory>,
    embedder: Arc<dyn EmbeddingProvider>,
) -> AgentMemory {
    let memory = &config.memory;
    AgentMemory::new(stream, embedder)
        .with_weights(score_weights(memory))
        .with_default_k(memory.default_k)
        .with_reflection_threshold(memory.reflection_threshold)
}

/// Persist the stream's store to the configured snapshot path, if any.
pub fn save_stream(
    config: &ReverieConfig,
    stream: &TimeWeightedMemory,
) -> Result<bool, MemoryError> {
    match config.memory.snapshot_path.as_ref() {
        Some(path) => {
            stream.store().save_snapshot(path)?;
            info!(
                "saved memory snapshot (path={}, records={})",
                path.display(),
                stream.store().len()
            );
            Ok(true)
        }
        None => Ok(false),
    }
}
