//! Time-weighted memory stream for simulated agents.
//!
//! Records are ranked by a weighted sum of index similarity, exponential
//! recency decay since last access, and normalized importance. Selecting a
//! record marks it accessed.

pub mod agent;
pub mod error;
pub mod index;
pub mod model;
pub mod provider;
pub mod reflection;
pub mod scoring;
mod snapshot;
pub mod store;
pub mod stream;

/// Text-level agent memory.
pub use agent::{AgentMemory, RememberOutcome};
/// Memory error types.
pub use error::{MemoryError, UpstreamError};
/// In-process similarity index.
pub use index::InMemorySimilarityIndex;
/// Memory record model.
pub use model::{MemoryId, MemoryRecord};
/// Collaborator interfaces.
pub use provider::{EmbeddingProvider, SimilarityIndex};
/// Reflection trigger.
pub use reflection::ReflectionTracker;
/// Scoring policy and weights.
pub use scoring::{
    DEFAULT_DECAY_RATE, DEFAULT_OVERFETCH_FACTOR, ScoreWeights, ScoredMemory, ScoringPolicy,
};
/// Record store.
pub use store::{MemoryRecordStore, StoreConfig};
/// Memory stream interface and default implementation.
pub use stream::{MemoryStream, TimeWeightedMemory};
