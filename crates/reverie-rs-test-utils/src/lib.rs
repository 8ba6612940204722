//! Test helpers shared across Reverie crates.

pub mod embedding;
pub mod index;
pub mod memory;

pub use embedding::{FailingEmbedder, FixedEmbedder, HashEmbedder, RecordingEmbedder};
pub use index::{DuplicatingIndex, FailingIndex, PendingIndex, ScriptedIndex};
pub use memory::{SelectCall, StubStream};
