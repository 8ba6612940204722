//! Layered configuration loader.
//!
//! Discovers configuration layers (system, user, cwd, runtime), validates each
//! against the schema, deep-merges them and produces a final `ReverieConfig`.

mod layer_io;
mod merge;
mod schema;
mod utils;


use crate::{ConfigError, ReverieConfig};
use log::{debug, info};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Default config filename in local layers.
const DEFAULT_CONFIG_FILE: &str = "reverie.json5";
/// Default config directory under the home directory.
const DEFAULT_CONFIG_DIR: &str = ".reverie";

#[cfg(unix)]
/// Default system config path on Unix.
const SYSTEM_CONFIG_PATH: &str = "/etc/reverie/reverie.json5";

/// Effective config plus metadata about which layers were loaded.
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    /// The merged, validated config.
    pub config: ReverieConfig,
    /// Metadata for each layer that contributed to the config.
    pub layers: Vec<ConfigLayer>,
}

/// Origin for a single config layer in the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayerSource {
    /// System-wide configuration.
    System,
    /// User-specific configuration.
    User,
    /// Current working directory configuration.
    Cwd,
    /// Runtime overrides (highest precedence).
    Runtime,
}

/// Metadata about a loaded config layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLayer {
    pub source: ConfigLayerSource,
    pub path: PathBuf,
}

/// Options controlling layered config discovery and overrides.
#[derive(Debug, Clone)]
pub struct LayeredConfigOptions {
    /// Working directory used to resolve relative paths and the cwd layer.
    pub cwd: PathBuf,
    /// Optional system config path (defaults to `/etc/reverie/reverie.json5` on Unix).
    pub system_config_path: Option<PathBuf>,
    /// Optional user config path (defaults to `~/.reverie/reverie.json5`).
    pub user_config_path: Option<PathBuf>,
    /// Runtime override config paths applied last, in order.
    pub runtime_paths: Vec<PathBuf>,
}

impl LayeredConfigOptions {
    /// Create options with default layer locations for the provided cwd.
    pub fn new(cwd: impl AsRef<Path>) -> Self {
        Self {
            cwd: cwd.as_ref().to_path_buf(),
            system_config_path: layer_io::default_system_config_path(),
            user_config_path: layer_io::default_user_config_path(),
            runtime_paths: Vec::new(),
        }
    }

    /// Add a runtime override config path that is applied last.
    pub fn with_runtime_path(mut self, path: impl AsRef<Path>) -> Self {
        self.runtime_paths.push(path.as_ref().to_path_buf());
        self
    }
}

impl ReverieConfig {
    /// Load a single config from a path (no layering).
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        info!("loading config from path: {}", path.as_ref().display());
        let contents = fs::read_to_string(path)?;
        let value: Value = json5::from_str(&contents)?;
        config_from_value(value, "config")
    }

    /// Load a single config from JSON5 contents (no layering).
    pub fn load_from_str(contents: &str) -> Result<Self, ConfigError> {
        debug!("loading config from raw contents (len={})", contents.len());
        let value: Value = json5::from_str(contents)?;
        config_from_value(value, "config")
    }

    /// Load a layered config stack using the default layer locations.
    pub fn load_layered(cwd: impl AsRef<Path>) -> Result<LayeredConfig, ConfigError> {
        info!(
            "loading layered config with defaults (cwd={})",
            cwd.as_ref().display()
        );
        Self::load_layered_with_options(LayeredConfigOptions::new(cwd))
    }

    /// Load a layered config stack using explicit layer locations and overrides.
    ///
    /// Layer precedence (low -> high): system, user, cwd, runtime overrides.
    /// A relative `memory.snapshot_path` is resolved against the cwd.
    pub fn load_layered_with_options(
        options: LayeredConfigOptions,
    ) -> Result<LayeredConfig, ConfigError> {
        let cwd = utils::normalize_path(&options.cwd)?;
        debug!("normalized cwd for config load: {}", cwd.display());
        let mut layers = Vec::new();
        let mut merged = Value::Object(serde_json::Map::new());
        let mut seen_paths = HashSet::new();

        let mut candidates = vec![
            (ConfigLayerSource::System, options.system_config_path, false),
            (ConfigLayerSource::User, options.user_config_path, false),
            (
                ConfigLayerSource::Cwd,
                Some(cwd.join(DEFAULT_CONFIG_FILE)),
                false,
            ),
        ];
        candidates.extend(options.runtime_paths.into_iter().map(|path| {
            (
                ConfigLayerSource::Runtime,
                Some(utils::resolve_relative(&cwd, &path)),
                true,
            )
        }));

        for (source, path, required) in candidates {
            let Some(path) = path else {
                continue;
            };
            if !required && !path.exists() {
                debug!(
                    "skipping missing layer (source={:?}, path={})",
                    source,
                    path.display()
                );
                continue;
            }
            if !seen_paths.insert(utils::unique_path(&path)) {
                debug!(
                    "skipping duplicate layer (source={:?}, path={})",
                    source,
                    path.display()
                );
                continue;
            }
            let loaded = layer_io::load_layer(source, &path)?;
            merge::merge_json_values(&mut merged, &loaded.value);
            layers.push(loaded.meta);
        }

        let mut config = config_from_value(merged, "effective")?;
        config.resolve_relative_paths(&cwd);
        info!("layered config loaded (layers={})", layers.len());
        Ok(LayeredConfig { config, layers })
    }

    /// Resolve a relative `memory.snapshot_path` against `base`.
    pub fn resolve_relative_paths(&mut self, base: impl AsRef<Path>) {
        if let Some(path) = self.memory.snapshot_path.take() {
            self.memory.snapshot_path = Some(utils::resolve_relative(base.as_ref(), &path));
        }
    }

    /// Validate configuration invariants that cannot be expressed in serde.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let memory = &self.memory;
        if memory.dimensions == 0 {
            return Err(ConfigError::Invalid(
                "memory.dimensions must be positive".to_string(),
            ));
        }
        if !memory.max_importance.is_finite() || memory.max_importance <= 0.0 {
            return Err(ConfigError::Invalid(
                "memory.max_importance must be a positive number".to_string(),
            ));
        }
        if !memory.min_importance.is_finite() || memory.min_importance > memory.max_importance {
            return Err(ConfigError::Invalid(format!(
                "memory.min_importance ({}) exceeds memory.max_importance ({})",
                memory.min_importance, memory.max_importance
            )));
        }
        if !memory.decay_rate.is_finite() || memory.decay_rate < 0.0 {
            return Err(ConfigError::Invalid(
                "memory.decay_rate must be non-negative".to_string(),
            ));
        }
        if memory.overfetch_factor == 0 {
            return Err(ConfigError::Invalid(
                "memory.overfetch_factor must be at least 1".to_string(),
            ));
        }
        if memory.default_k == 0 {
            return Err(ConfigError::Invalid(
                "memory.default_k must be positive".to_string(),
            ));
        }
        let weights = &memory.weights;
        for (name, weight) in [
            ("similarity", weights.similarity),
            ("recency", weights.recency),
            ("importance", weights.importance),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "memory.weights.{name} must be non-negative"
                )));
            }
        }
        if let Some(threshold) = memory.reflection_threshold
            && (!threshold.is_finite() || threshold <= 0.0)
        {
            return Err(ConfigError::Invalid(
                "memory.reflection_threshold must be positive".to_string(),
            ));
        }
        if self.embeddings.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "embeddings.base_url must not be empty".to_string(),
            ));
        }
        if self.embeddings.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "embeddings.timeout_secs must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

/// Internal representation of a loaded config layer.
#[derive(Debug, Clone)]
struct LoadedLayer {
    meta: ConfigLayer,
    value: Value,
}

fn config_from_value(value: Value, label: &str) -> Result<ReverieConfig, ConfigError> {
    schema::validate_layer_schema(&value, label)?;
    let config: ReverieConfig = serde_json::from_value(value)?;
    config.validate()?;
    Ok(config)
}
