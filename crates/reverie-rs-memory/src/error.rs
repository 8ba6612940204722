//! Error types for memory operations.

use crate::model::MemoryId;

/// Boxed error produced by an embedding provider or similarity index.
pub type UpstreamError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned by the memory store, scoring policy and helpers.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// Malformed arguments (dimensionality, importance bounds, `k`, weights).
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Referenced record does not exist.
    #[error("memory not found: {0}")]
    NotFound(MemoryId),
    /// No records exist yet to select from.
    #[error("memory store is empty")]
    EmptyStore,
    /// Embedding provider or similarity index failed.
    #[error("upstream failure: {0}")]
    UpstreamFailure(#[source] UpstreamError),
    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl MemoryError {
    /// Build an `InvalidInput` error from any message.
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}
