//! Configuration management for the CareRoute CLI
//!
//! Loads the engine configuration from `--config` or ~/.careroute/config.toml

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use careroute::EngineConfig;

/// Get the path to the default config file
pub fn config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".careroute")
        .join("config.toml")
}

/// Load configuration
///
/// An explicit path must exist. The default path is optional and falls back to
/// built-in defaults when missing.
pub fn load(explicit: Option<&Path>) -> Result<EngineConfig> {
    load_from(explicit, &config_path())
}

fn load_from(explicit: Option<&Path>, default_path: &Path) -> Result<EngineConfig> {
    match explicit {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => EngineConfig::load_or_default(default_path)
            .with_context(|| format!("Failed to load config from {}", default_path.display())),
    }
}

/// Render configuration as TOML
pub fn to_toml(config: &EngineConfig) -> Result<String> {
    Ok(toml::to_string_pretty(config)?)
}

/// Save configuration to file
pub fn save(config: &EngineConfig, path: &Path) -> Result<()> {
    // Ensure directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::write(path, to_toml(config)?)?;
    Ok(())
}
