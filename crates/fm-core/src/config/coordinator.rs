//! Coordinator configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::serde_utils::duration_secs;

/// Configuration for the coordinator daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Address to bind the HTTP server to
    pub bind_address: String,

    /// How long a device may go without a report before it is shown offline
    #[serde(with = "duration_secs")]
    pub offline_threshold: Duration,

    /// Capacity of each per-metric history buffer
    pub history_capacity: usize,

    /// Reserved identity of the coordinator host itself; a terminal session
    /// started for this identity is backed by a local pseudo-terminal
    pub local_identity: String,

    /// Shell spawned for local terminal sessions (None = $SHELL, then /bin/sh)
    pub local_shell: Option<String>,

    /// Byte cap per relay buffer direction; oldest chunks are dropped
    /// once a stalled peer lets a buffer grow past this
    pub relay_buffer_limit: usize,

    /// Whether the coordinator reports its own host under `local_identity`
    pub self_telemetry: bool,

    /// Interval between self-telemetry samples
    #[serde(with = "duration_secs")]
    pub self_telemetry_interval: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            offline_threshold: Duration::from_secs(15),
            history_capacity: 50,
            local_identity: "server".to_string(),
            local_shell: None,
            relay_buffer_limit: 64 * 1024,
            self_telemetry: true,
            self_telemetry_interval: Duration::from_secs(2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_protocol_constants() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.offline_threshold, Duration::from_secs(15));
        assert_eq!(config.history_capacity, 50);
        assert_eq!(config.local_identity, "server");
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: CoordinatorConfig =
            toml::from_str(r#"bind_address = "127.0.0.1:4000""#).unwrap();
        assert_eq!(config.bind_address, "127.0.0.1:4000");
        assert_eq!(config.history_capacity, 50);
    }
}
