//! Public SDK surface for Reverie.
//!
//! This crate re-exports the memory and config building blocks and wires them
//! together from a loaded config. It also hosts the `reverie` CLI, an HTTP
//! embedding provider and a small logging initialization helper.

pub mod assembly;
pub mod cli;
pub mod embeddings;

/// Re-export for convenience.
pub use reverie_rs_config as config;
/// Re-export for convenience.
pub use reverie_rs_memory as memory;

pub use assembly::{agent_memory, open_stream, save_stream};
pub use embeddings::{EmbeddingClientError, HttpEmbeddingProvider};

#[inline]
/// Initialize logging using env_logger if the "logging" feature is enabled.
///
/// This is a no-op if the feature is not enabled. Binaries are still expected
/// to call this early in startup to ensure log output is wired up.
pub fn init_logging() {
    #[cfg(feature = "logging")]
    {
        let _ = env_logger::builder()
            .format_timestamp_millis()
            .parse_default_env()
            .try_init();
    }
}
