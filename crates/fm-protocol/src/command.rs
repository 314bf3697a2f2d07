//! Command bodies for the piggybacked delivery channel
//!
//! Agents cannot be pushed to, so operator actions are queued on the
//! coordinator and ride the next telemetry response. These are the wire
//! shapes of those actions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Power action an operator can queue for a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerAction {
    /// Restart the device
    Reboot,
    /// Power the device off
    Shutdown,
}

impl fmt::Display for PowerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PowerAction::Reboot => write!(f, "reboot"),
            PowerAction::Shutdown => write!(f, "shutdown"),
        }
    }
}

/// Command discriminant carried in a telemetry response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    /// Restart the device
    Reboot,
    /// Power the device off
    Shutdown,
    /// Pull and apply a self-update (source location rides alongside)
    Update,
}

/// `POST /api/devices/power` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerRequest {
    /// Target device identity
    pub id: String,
    /// Action to queue
    pub action: PowerAction,
}

/// `POST /api/update/repo` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRepoRequest {
    /// Repository the update is pulled from
    pub url: String,
    /// Optional access credential for the repository
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// `POST /api/update/execute` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateExecuteRequest {
    /// Device the update command is queued for
    pub id: String,
}

/// `GET /api/update/check` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatus {
    /// Currently configured repository, empty when unset
    pub repo_url: String,
    /// Whether a credential is configured (the credential itself is never echoed)
    pub token_set: bool,
    /// Unix timestamp (seconds) of the last check
    pub last_checked: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_action_wire_format() {
        assert_eq!(
            serde_json::to_string(&PowerAction::Reboot).unwrap(),
            r#""reboot""#
        );
        let parsed: PowerAction = serde_json::from_str(r#""shutdown""#).unwrap();
        assert_eq!(parsed, PowerAction::Shutdown);
    }

    #[test]
    fn test_power_request_parses() {
        let req: PowerRequest =
            serde_json::from_str(r#"{"id":"pi-01","action":"reboot"}"#).unwrap();
        assert_eq!(req.id, "pi-01");
        assert_eq!(req.action, PowerAction::Reboot);
    }

    #[test]
    fn test_command_kind_update() {
        assert_eq!(
            serde_json::to_string(&CommandKind::Update).unwrap(),
            r#""update""#
        );
    }
}
