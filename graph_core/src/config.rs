//! Configuration for the graph engine.
//!
//! Loaded from a TOML file, falling back to the builtin `data/engine_config.toml`.

use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const BUILTIN_ENGINE_CONFIG: &str = include_str!("data/engine_config.toml");

/// Environment variable naming an override config file.
pub const CONFIG_PATH_ENV: &str = "GRAPH_CORE_CONFIG_PATH";

/// Smallest node budget that still fits one aggregate per entity kind plus
/// the selection and a few individual nodes.
pub const MIN_NODE_BUDGET: usize = 8;

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Hard cap on rendered nodes after aggregation.
    pub node_budget: usize,
    /// Raw node count above which viewport culling applies.
    pub cull_threshold: usize,
    /// Groups smaller than this render individually when they fit.
    pub min_aggregate_size: usize,
    pub viewport: ViewportConfig,
    pub performance: PerformanceConfig,
    pub search: SearchConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            node_budget: 50,
            cull_threshold: 100,
            min_aggregate_size: 3,
            viewport: ViewportConfig::default(),
            performance: PerformanceConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    /// Graph-space margin added around the visible rectangle.
    pub padding: f32,
    /// Zoom below which labels are hidden.
    pub label_zoom_threshold: f32,
    /// Minimum interval between admitted viewport updates.
    pub throttle_ms: u64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            padding: 100.0,
            label_zoom_threshold: 0.5,
            throttle_ms: 100,
        }
    }
}

impl ViewportConfig {
    pub fn throttle_interval(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Visible node count at which automatic mode switches to performance.
    pub node_threshold: usize,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self { node_threshold: 40 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub max_results: usize,
    pub debounce_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: 20,
            debounce_ms: 300,
        }
    }
}

impl SearchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl EngineConfig {
    /// The compiled-in configuration.
    pub fn builtin() -> Self {
        Self::from_toml_str(BUILTIN_ENGINE_CONFIG).expect("builtin engine config should parse")
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node_budget < MIN_NODE_BUDGET {
            return Err(ConfigError::Invalid(format!(
                "node_budget must be at least {MIN_NODE_BUDGET}, got {}",
                self.node_budget
            )));
        }
        if self.cull_threshold < self.node_budget {
            return Err(ConfigError::Invalid(format!(
                "cull_threshold ({}) must not be below node_budget ({})",
                self.cull_threshold, self.node_budget
            )));
        }
        if self.min_aggregate_size == 0 {
            return Err(ConfigError::Invalid(
                "min_aggregate_size must be positive".to_string(),
            ));
        }
        if self.viewport.padding.is_nan() || self.viewport.padding < 0.0 {
            return Err(ConfigError::Invalid(
                "viewport.padding must be non-negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Raise out-of-range values to the nearest valid ones, so a config that
    /// skipped [`validate`](Self::validate) is still safe to render with.
    pub fn sanitized(mut self) -> Self {
        if let Err(err) = self.validate() {
            tracing::warn!(
                target: "graph_core::config",
                error = %err,
                "engine_config.sanitized"
            );
        }
        self.node_budget = self.node_budget.max(MIN_NODE_BUDGET);
        self.cull_threshold = self.cull_threshold.max(self.node_budget);
        self.min_aggregate_size = self.min_aggregate_size.max(1);
        if self.viewport.padding.is_nan() || self.viewport.padding < 0.0 {
            self.viewport.padding = 0.0;
        }
        self
    }
}

/// Load the engine configuration from `GRAPH_CORE_CONFIG_PATH`, or the builtin.
///
/// Returns the config and the path it came from, if any.
pub fn load_config_from_env() -> (EngineConfig, Option<PathBuf>) {
    if let Some(path) = env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from) {
        match EngineConfig::from_file(&path) {
            Ok(config) => {
                tracing::info!(
                    target: "graph_core::config",
                    path = %path.display(),
                    "engine_config.loaded=file"
                );
                return (config, Some(path));
            }
            Err(err) => {
                tracing::warn!(
                    target: "graph_core::config",
                    path = %path.display(),
                    error = %err,
                    "engine_config.load_failed"
                );
            }
        }
    }

    tracing::info!(target: "graph_core::config", "engine_config.loaded=builtin");
    (EngineConfig::builtin(), None)
}
