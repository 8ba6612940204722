//! Configuration schema for Reverie.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root config for the Reverie SDK and CLI.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ReverieConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub embeddings: EmbeddingsConfig,
}

impl ReverieConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> ReverieConfigBuilder {
        ReverieConfigBuilder::new()
    }
}

/// Builder for assembling a `ReverieConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct ReverieConfigBuilder {
    config: ReverieConfig,
}

impl ReverieConfigBuilder {
    /// Create a new builder seeded with default config values.
    pub fn new() -> Self {
        Self {
            config: ReverieConfig::default(),
        }
    }

    /// Replace the memory configuration.
    pub fn memory(mut self, memory: MemoryConfig) -> Self {
        self.config.memory = memory;
        self
    }

    /// Replace the embedding client configuration.
    pub fn embeddings(mut self, embeddings: EmbeddingsConfig) -> Self {
        self.config.embeddings = embeddings;
        self
    }

    /// Finalize and return the built `ReverieConfig`.
    pub fn build(self) -> ReverieConfig {
        self.config
    }
}

/// Memory stream configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryConfig {
    /// Length every stored embedding must have.
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
    #[serde(default = "default_min_importance")]
    pub min_importance: f64,
    /// Importance that normalizes to 1.0 when scoring.
    #[serde(default = "default_max_importance")]
    pub max_importance: f64,
    /// Recency decay per hour since last access.
    #[serde(default = "default_decay_rate")]
    pub decay_rate: f64,
    /// Candidates fetched from the index per requested memory.
    #[serde(default = "default_overfetch_factor")]
    pub overfetch_factor: usize,
    /// Memories returned by a recall.
    #[serde(default = "default_recall_k")]
    pub default_k: usize,
    #[serde(default)]
    pub weights: ScoreWeightsConfig,
    /// Accumulated importance that triggers a reflection; unset disables it.
    #[serde(default)]
    pub reflection_threshold: Option<f64>,
    /// JSONL snapshot used by the CLI.
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            dimensions: default_dimensions(),
            min_importance: default_min_importance(),
            max_importance: default_max_importance(),
            decay_rate: default_decay_rate(),
            overfetch_factor: default_overfetch_factor(),
            default_k: default_recall_k(),
            weights: ScoreWeightsConfig::default(),
            reflection_threshold: None,
            snapshot_path: None,
        }
    }
}

fn default_dimensions() -> usize {
    384
}

fn default_min_importance() -> f64 {
    1.0
}

fn default_max_importance() -> f64 {
    10.0
}

fn default_decay_rate() -> f64 {
    std::f64::consts::LN_2 / 100.0
}

fn default_overfetch_factor() -> usize {
    4
}

fn default_recall_k() -> usize {
    4
}

/// Relative weights of the three ranking signals.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScoreWeightsConfig {
    #[serde(default = "default_weight")]
    pub similarity: f64,
    #[serde(default = "default_weight")]
    pub recency: f64,
    #[serde(default = "default_weight")]
    pub importance: f64,
}

impl Default for ScoreWeightsConfig {
    fn default() -> Self {
        Self {
            similarity: default_weight(),
            recency: default_weight(),
            importance: default_weight(),
        }
    }
}

fn default_weight() -> f64 {
    1.0
}

/// OpenAI-compatible embeddings endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmbeddingsConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Environment variable holding a bearer token, if the endpoint needs one.
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_embedding_model(),
            api_key_env: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:11434".to_string()
}

fn default_embedding_model() -> String {
    "all-minilm".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}
