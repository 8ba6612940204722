//! Memory record model owned by the record store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a stored memory. Ids are allocated in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryId(pub u64);

impl fmt::Display for MemoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mem-{}", self.0)
    }
}

/// One stored observation or reflection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryRecord {
    /// Record identifier.
    pub id: MemoryId,
    /// Observation or reflection content.
    pub text: String,
    /// Embedding computed once at creation.
    pub embedding: Vec<f32>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last time the record was selected by a query.
    pub last_accessed_at: DateTime<Utc>,
    /// Importance score within the store's configured bounds.
    pub importance: f64,
}

impl MemoryRecord {
    /// Hours elapsed between the last access and `now`, never negative.
    pub fn hours_since_access(&self, now: DateTime<Utc>) -> f64 {
        let millis = (now - self.last_accessed_at).num_milliseconds().max(0);
        millis as f64 / 3_600_000.0
    }
}
