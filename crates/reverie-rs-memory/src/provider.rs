//! Collaborator interfaces consumed by the memory store.
//!
//! Neither trait is implemented by the core beyond the in-process
//! [`InMemorySimilarityIndex`](crate::InMemorySimilarityIndex); hosted vector
//! databases and embedding services plug in here.

use crate::error::UpstreamError;
use crate::model::MemoryId;
use async_trait::async_trait;

#[async_trait]
/// Computes fixed-length embeddings for text.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text. Failures are not retried by the caller.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, UpstreamError>;
}

#[async_trait]
/// Nearest-neighbour lookup over record embeddings.
///
/// Implementations may be eventually consistent: an inserted id is not
/// guaranteed to be returned by an immediately following query.
pub trait SimilarityIndex: Send + Sync {
    /// Register the vector for a record id.
    async fn insert(&self, id: MemoryId, vector: Vec<f32>) -> Result<(), UpstreamError>;

    /// Return up to `limit` ids ordered by similarity, highest first.
    ///
    /// Similarity is expected in `[0, 1]` where `1.0` means identical.
    async fn query(&self, vector: &[f32], limit: usize)
    -> Result<Vec<(MemoryId, f32)>, UpstreamError>;
}
