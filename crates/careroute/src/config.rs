//! Configuration for the CareRoute engine

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::topology::builder::{GraphSpec, Topology};
use crate::{EngineError, Result};

/// Graph defaults used when a request does not name its own parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphConfig {
    /// Topology built when the orchestrator starts
    #[serde(default)]
    pub default_topology: Topology,
    /// Neighbor count for KNN and bipartite-KNN graphs
    #[serde(default = "default_k_neighbors")]
    pub k_neighbors: usize,
    /// Connection radius for radius graphs
    #[serde(default = "default_radius_km")]
    pub radius_km: f64,
}

fn default_k_neighbors() -> usize {
    10
}

fn default_radius_km() -> f64 {
    50.0
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            default_topology: Topology::default(),
            k_neighbors: default_k_neighbors(),
            radius_km: default_radius_km(),
        }
    }
}

impl GraphConfig {
    /// Spec of the graph built at startup
    pub fn default_spec(&self) -> GraphSpec {
        GraphSpec {
            topology: self.default_topology,
            k: self.k_neighbors,
            radius_km: self.radius_km,
        }
    }
}

/// Settings for the min-cost flow strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentConfig {
    /// Multiplier turning kilometers into integer flow costs
    #[serde(default = "default_cost_scale")]
    pub cost_scale: f64,
}

fn default_cost_scale() -> f64 {
    100.0
}

impl Default for AssignmentConfig {
    fn default() -> Self {
        Self {
            cost_scale: default_cost_scale(),
        }
    }
}

/// Road routing provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// First backoff delay; doubles on every retry
    #[serde(default = "default_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Directory for the file-backed route cache; in-memory when unset
    #[serde(default)]
    pub cache_dir: Option<String>,
}

fn default_base_url() -> String {
    "https://api.openrouteservice.org".to_string()
}

fn default_api_key_env() -> String {
    "ORS_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Upper bound on routing attempts per request
pub const MAX_ROUTING_RETRIES: u32 = 10;

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    1000
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_backoff_ms(),
            cache_dir: None,
        }
    }
}

impl RoutingConfig {
    /// Read the API key from the configured environment variable
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}

/// Core configuration for the engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub assignment: AssignmentConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
}

impl EngineConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig =
            toml::from_str(content).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Load from `path` if it exists, defaults otherwise
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.graph.default_spec().validate()?;
        if !(self.assignment.cost_scale.is_finite() && self.assignment.cost_scale > 0.0) {
            return Err(EngineError::Config(format!(
                "assignment.costScale must be positive, got {}",
                self.assignment.cost_scale
            )));
        }
        if !(1..=MAX_ROUTING_RETRIES).contains(&self.routing.max_retries) {
            return Err(EngineError::Config(format!(
                "routing.maxRetries must be between 1 and {MAX_ROUTING_RETRIES}, got {}",
                self.routing.max_retries
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.graph.default_topology, Topology::Knn);
        assert_eq!(config.graph.k_neighbors, 10);
        assert_eq!(config.graph.radius_km, 50.0);
        assert_eq!(config.assignment.cost_scale, 100.0);
        assert_eq!(config.routing.max_retries, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config = EngineConfig::from_toml_str(
            r#"
            [graph]
            defaultTopology = "bipartite_knn"
            kNeighbors = 5

            [routing]
            timeoutSecs = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.graph.default_topology, Topology::BipartiteKnn);
        assert_eq!(config.graph.k_neighbors, 5);
        assert_eq!(config.graph.radius_km, 50.0);
        assert_eq!(config.routing.timeout_secs, 10);
        assert_eq!(config.routing.max_retries, 3);
    }

    #[test]
    fn test_rejects_unknown_topology() {
        let err = EngineConfig::from_toml_str("[graph]\ndefaultTopology = \"ring\"\n");
        assert!(matches!(err, Err(EngineError::Config(_))));
    }

    #[test]
    fn test_rejects_zero_k() {
        let err = EngineConfig::from_toml_str("[graph]\nkNeighbors = 0\n");
        assert!(matches!(err, Err(EngineError::InvalidGraphParameter(_))));
    }

    #[test]
    fn test_rejects_out_of_range_retries() {
        for retries in [0, MAX_ROUTING_RETRIES + 1, 40] {
            let toml = format!("[routing]\nmaxRetries = {retries}\n");
            assert!(matches!(
                EngineConfig::from_toml_str(&toml),
                Err(EngineError::Config(_))
            ));
        }
        let toml = format!("[routing]\nmaxRetries = {MAX_ROUTING_RETRIES}\n");
        assert!(EngineConfig::from_toml_str(&toml).is_ok());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::load_or_default(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.graph.k_neighbors, 10);
    }
}
