//! Agent configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::serde_utils::{duration_millis, duration_secs};

/// Configuration for the device agent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Coordinator base URL, e.g. `http://192.168.1.10:3000`
    pub server_url: String,

    /// Device identity (defaults to `<hostname>-<arch>`)
    pub identity: Option<String>,

    /// Display name (defaults to hostname)
    pub name: Option<String>,

    /// Interval between telemetry polls
    #[serde(with = "duration_secs")]
    pub poll_interval: Duration,

    /// Interval between terminal sync polls (runs alongside telemetry)
    #[serde(with = "duration_millis")]
    pub sync_interval: Duration,

    /// Shell spawned for relay terminal sessions (None = $SHELL, then /bin/sh)
    pub shell: Option<String>,

    /// Request timeout for coordinator calls
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:3000".to_string(),
            identity: None,
            name: None,
            poll_interval: Duration::from_secs(1),
            sync_interval: Duration::from_millis(200),
            shell: None,
            request_timeout: Duration::from_secs(5),
        }
    }
}

impl AgentConfig {
    /// Resolve the device identity, falling back to `<hostname>-<arch>`,
    /// which is stable across restarts without any stored state.
    pub fn device_id(&self) -> String {
        self.identity.clone().unwrap_or_else(|| {
            format!(
                "{}-{}",
                sysinfo::System::host_name().unwrap_or_else(|| "unknown".to_string()),
                std::env::consts::ARCH
            )
        })
    }

    /// Resolve the display name, falling back to hostname.
    pub fn device_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            sysinfo::System::host_name().unwrap_or_else(|| self.device_id())
        })
    }

    /// Coordinator endpoint for a given API path.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.server_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_identity_wins() {
        let config = AgentConfig {
            identity: Some("pi-01".to_string()),
            ..Default::default()
        };
        assert_eq!(config.device_id(), "pi-01");
    }

    #[test]
    fn test_derived_identity_carries_arch() {
        let config = AgentConfig::default();
        assert!(config.device_id().ends_with(std::env::consts::ARCH));
    }

    #[test]
    fn test_endpoint_joins_slashes() {
        let config = AgentConfig {
            server_url: "http://host:3000/".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.endpoint("/api/telemetry"),
            "http://host:3000/api/telemetry"
        );
    }
}
