//! Configuration management for FleetMon

mod agent;
mod coordinator;
pub mod serde_utils;

pub use agent::AgentConfig;
pub use coordinator::CoordinatorConfig;

use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// Get the default configuration directory
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fleetmon")
}

/// Load configuration from a file
pub fn load_config<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Invalid(format!("Failed to read config: {}", e)))?;

    let config: T = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to a file
pub fn save_config<T: serde::Serialize>(path: &Path, config: &T) -> Result<(), ConfigError> {
    let content = toml::to_string_pretty(config)?;

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| ConfigError::Invalid(format!("Failed to create config dir: {}", e)))?;
    }

    std::fs::write(path, content)
        .map_err(|e| ConfigError::Invalid(format!("Failed to write config: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coordinator.toml");

        let config = CoordinatorConfig::default();
        save_config(&path, &config).unwrap();

        let loaded: CoordinatorConfig = load_config(&path).unwrap();
        assert_eq!(loaded.bind_address, config.bind_address);
        assert_eq!(loaded.history_capacity, config.history_capacity);
        assert_eq!(loaded.offline_threshold, config.offline_threshold);
    }

    #[test]
    fn test_load_missing_config() {
        let result: Result<CoordinatorConfig, _> =
            load_config(Path::new("/nonexistent/fleetmon.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }
}
