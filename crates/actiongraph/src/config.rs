//! Configuration.
//!
//! Layers, later wins: built-in defaults, `actiongraph.yaml`, `ACTIONGRAPH_*`
//! environment variables, then whatever the caller sets with the `with_*`
//! methods (the CLI maps its flags onto those).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::compiler::{CompileOptions, DEFAULT_FEATURE_DIR, DEFAULT_STEPS_DIR};
use crate::graph::{GraphStore, DEFAULT_GRAPHS_DIR};
use crate::registry::{DEFAULT_REGISTRY_PATH, REGISTRY_PATH_ENV};
use crate::resolver::{
    parse_strategy_list, AmbiguityPolicy, RegistryCache, Resolver, Strategy, STRATEGY_ORDER_ENV,
};

/// Config file looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "actiongraph.yaml";

/// Errors loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("Cannot read config {path}: {source}")]
    Io {
        /// Config path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// File is not valid YAML for this schema
    #[error("Invalid config {path}: {source}")]
    Parse {
        /// Config path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: serde_yaml_ng::Error,
    },

    /// An environment override has an unusable value
    #[error("Invalid value '{value}' for {key}: {message}")]
    InvalidValue {
        /// Variable name
        key: String,
        /// Raw value
        value: String,
        /// What is wrong
        message: String,
    },
}

/// Result type for configuration
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Effective settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionGraphConfig {
    /// Graph store directory
    pub graphs_dir: PathBuf,
    /// Selector registry file
    pub registry_path: PathBuf,
    /// Scenario document output directory
    pub feature_dir: PathBuf,
    /// Step-definition output directory
    pub steps_dir: PathBuf,
    /// Write versioned graph snapshots
    pub versioned: bool,
    /// Resolver strategy order (omitted defaults are appended)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy_order: Option<Vec<Strategy>>,
    /// Behaviour on ambiguous matches
    pub ambiguity_policy: AmbiguityPolicy,
    /// Per-route navigation budget
    pub navigation_timeout_ms: u64,
    /// Batch workers (0 = one per core)
    pub workers: usize,
}

impl Default for ActionGraphConfig {
    fn default() -> Self {
        Self {
            graphs_dir: PathBuf::from(DEFAULT_GRAPHS_DIR),
            registry_path: PathBuf::from(DEFAULT_REGISTRY_PATH),
            feature_dir: PathBuf::from(DEFAULT_FEATURE_DIR),
            steps_dir: PathBuf::from(DEFAULT_STEPS_DIR),
            versioned: true,
            strategy_order: None,
            ambiguity_policy: AmbiguityPolicy::First,
            navigation_timeout_ms: 15_000,
            workers: 0,
        }
    }
}

impl ActionGraphConfig {
    /// Defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults, then `path` (or `./actiongraph.yaml` when present), then the
    /// process environment.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(CONFIG_FILE_NAME).is_file() => Self::from_file(Path::new(CONFIG_FILE_NAME))?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Defaults overlaid with a YAML file
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Defaults overlaid with YAML text
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml_ng::Error> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml_ng::from_str(yaml)
    }

    /// Apply `ACTIONGRAPH_*` overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("ACTIONGRAPH_GRAPHS_DIR") {
            self.graphs_dir = PathBuf::from(v);
        }
        if let Some(v) = get(REGISTRY_PATH_ENV) {
            self.registry_path = PathBuf::from(v);
        }
        if let Some(v) = get("ACTIONGRAPH_FEATURE_DIR") {
            self.feature_dir = PathBuf::from(v);
        }
        if let Some(v) = get("ACTIONGRAPH_STEPS_DIR") {
            self.steps_dir = PathBuf::from(v);
        }
        if let Some(v) = get("ACTIONGRAPH_VERSIONED") {
            self.versioned = parse_bool("ACTIONGRAPH_VERSIONED", &v)?;
        }
        if let Some(v) = get(STRATEGY_ORDER_ENV) {
            let order = parse_strategy_list(&v);
            if !order.is_empty() {
                self.strategy_order = Some(order);
            }
        }
        if let Some(v) = get("ACTIONGRAPH_AMBIGUITY_POLICY") {
            self.ambiguity_policy = v.parse().map_err(|message| ConfigError::InvalidValue {
                key: "ACTIONGRAPH_AMBIGUITY_POLICY".to_string(),
                value: v.clone(),
                message,
            })?;
        }
        if let Some(v) = get("ACTIONGRAPH_NAVIGATION_TIMEOUT_MS") {
            self.navigation_timeout_ms = parse_number("ACTIONGRAPH_NAVIGATION_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = get("ACTIONGRAPH_WORKERS") {
            self.workers = parse_number("ACTIONGRAPH_WORKERS", &v)?;
        }
        Ok(())
    }

    /// Set the graph store directory
    #[must_use]
    pub fn with_graphs_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.graphs_dir = dir.into();
        self
    }

    /// Set the registry file
    #[must_use]
    pub fn with_registry_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.registry_path = path.into();
        self
    }

    /// Set the scenario document directory
    #[must_use]
    pub fn with_feature_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.feature_dir = dir.into();
        self
    }

    /// Set the step-definition directory
    #[must_use]
    pub fn with_steps_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.steps_dir = dir.into();
        self
    }

    /// Set versioned writes
    #[must_use]
    pub const fn with_versioned(mut self, versioned: bool) -> Self {
        self.versioned = versioned;
        self
    }

    /// Set the ambiguity policy
    #[must_use]
    pub const fn with_ambiguity_policy(mut self, policy: AmbiguityPolicy) -> Self {
        self.ambiguity_policy = policy;
        self
    }

    /// Set the strategy order
    #[must_use]
    pub fn with_strategy_order(mut self, order: Vec<Strategy>) -> Self {
        self.strategy_order = Some(order);
        self
    }

    /// Set the worker count
    #[must_use]
    pub const fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Navigation budget
    #[must_use]
    pub const fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    /// Worker count with 0 meaning one per core
    #[must_use]
    pub fn effective_workers(&self) -> usize {
        crate::batch::effective_workers(self.workers)
    }

    /// Graph store over `graphs_dir`
    #[must_use]
    pub fn store(&self) -> GraphStore {
        GraphStore::new(&self.graphs_dir).with_versioned(self.versioned)
    }

    /// Compile options writing to the configured directories
    #[must_use]
    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions::new(&self.feature_dir, &self.steps_dir)
    }

    /// Resolver over the configured registry
    #[must_use]
    pub fn resolver(&self) -> Arc<Resolver> {
        let mut resolver = Resolver::new(RegistryCache::new(&self.registry_path))
            .with_policy(self.ambiguity_policy);
        if let Some(order) = &self.strategy_order {
            resolver = resolver.with_strategy_order(order.clone());
        }
        Arc::new(resolver)
    }

    /// YAML rendering of the effective configuration
    pub fn to_yaml(&self) -> Result<String, serde_yaml_ng::Error> {
        serde_yaml_ng::to_string(self)
    }
}

fn parse_bool(key: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            message: "expected a boolean".to_string(),
        }),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> ConfigResult<T> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        message: "expected a non-negative integer".to_string(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ActionGraphConfig::default();
        assert_eq!(config.graphs_dir, PathBuf::from(".actiongraph/graphs"));
        assert_eq!(config.registry_path, PathBuf::from(".actiongraph/selectors.json"));
        assert!(config.versioned);
        assert_eq!(config.ambiguity_policy, AmbiguityPolicy::First);
        assert_eq!(config.navigation_timeout(), Duration::from_secs(15));
    }

    #[test]
    fn test_yaml_overlay_keeps_defaults() {
        let config = ActionGraphConfig::from_yaml(
            "feature_dir: out/features\nambiguity_policy: error\nstrategy_order: [testid, css]\n",
        )
        .unwrap();
        assert_eq!(config.feature_dir, PathBuf::from("out/features"));
        assert_eq!(config.ambiguity_policy, AmbiguityPolicy::Error);
        assert_eq!(config.strategy_order, Some(vec![Strategy::TestId, Strategy::Css]));
        assert_eq!(config.steps_dir, PathBuf::from("tests/steps"));
    }

    #[test]
    fn test_empty_yaml() {
        assert_eq!(ActionGraphConfig::from_yaml("  \n").unwrap(), ActionGraphConfig::default());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ActionGraphConfig::default();
        config
            .apply_env(env(&[
                ("ACTIONGRAPH_VERSIONED", "off"),
                ("ACTIONGRAPH_WORKERS", "4"),
                ("ACTIONGRAPH_SELECTOR_STRATEGIES", "css,bogus"),
                ("ACTIONGRAPH_AMBIGUITY_POLICY", "warn"),
                ("ACTIONGRAPH_REGISTRY_PATH", "/tmp/sel.json"),
            ]))
            .unwrap();
        assert!(!config.versioned);
        assert_eq!(config.workers, 4);
        assert_eq!(config.strategy_order, Some(vec![Strategy::Css]));
        assert_eq!(config.ambiguity_policy, AmbiguityPolicy::Warn);
        assert_eq!(config.registry_path, PathBuf::from("/tmp/sel.json"));
    }

    #[test]
    fn test_invalid_env_value() {
        let mut config = ActionGraphConfig::default();
        let err = config
            .apply_env(env(&[("ACTIONGRAPH_NAVIGATION_TIMEOUT_MS", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("ACTIONGRAPH_NAVIGATION_TIMEOUT_MS"));
    }

    #[test]
    fn test_from_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = ActionGraphConfig::from_file(&dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));

        let bad = dir.path().join("bad.yaml");
        std::fs::write(&bad, "workers: [1, 2]\n").unwrap();
        assert!(matches!(
            ActionGraphConfig::from_file(&bad).unwrap_err(),
            ConfigError::Parse { .. }
        ));
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = ActionGraphConfig::default().with_workers(2).with_versioned(false);
        let back = ActionGraphConfig::from_yaml(&config.to_yaml().unwrap()).unwrap();
        assert_eq!(back, config);
    }
}
