//! Terminal session bodies
//!
//! Two session kinds share one viewer-facing surface: a *local* session is
//! backed by a pseudo-terminal on the coordinator host, a *relay* session
//! is bridged entirely through the device's own sync polls.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which backing a terminal session was given on start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    /// Pseudo-terminal and child shell on the coordinator host
    Local,
    /// Buffer pair drained by the device's sync polls
    Relay,
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionMode::Local => write!(f, "local"),
            SessionMode::Relay => write!(f, "relay"),
        }
    }
}

/// Generic `{status}` acknowledgment body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Outcome, e.g. "ok" or "queued"
    pub status: String,
}

impl StatusResponse {
    /// Plain "ok" acknowledgment.
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }

    /// "queued" acknowledgment for mailbox writes.
    pub fn queued() -> Self {
        Self {
            status: "queued".to_string(),
        }
    }
}

/// `POST /api/terminal/{id}/start` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalStartResponse {
    /// "ok" on success
    pub status: String,
    /// Mode the new session was given
    pub mode: SessionMode,
}

/// `POST /api/terminal/{id}/input` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalInputRequest {
    /// Keystrokes from the viewer, delivered in issue order
    pub data: String,
}

/// `GET /api/terminal/{id}/output` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalOutputResponse {
    /// Everything produced since the previous read, concatenated
    pub output: String,
}

/// `POST /api/terminal/sync` request body, sent by the relay-mode device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRequest {
    /// Device identity
    pub id: String,
    /// Shell output accumulated on the device since the previous sync
    pub output: String,
}

/// `POST /api/terminal/sync` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResponse {
    /// Viewer input accumulated since the previous sync, concatenated
    pub input: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_mode_wire_format() {
        assert_eq!(
            serde_json::to_string(&SessionMode::Relay).unwrap(),
            r#""relay""#
        );
        assert_eq!(SessionMode::Local.to_string(), "local");
    }

    #[test]
    fn test_sync_round_trip() {
        let req = SyncRequest {
            id: "pi-01".to_string(),
            output: "total 0\n".to_string(),
        };
        let json = serde_json::to_string(&req).unwrap();
        let back: SyncRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, "pi-01");
        assert_eq!(back.output, "total 0\n");
    }
}
