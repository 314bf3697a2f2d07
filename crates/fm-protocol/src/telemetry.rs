//! Telemetry bodies and device projections
//!
//! Compound field names are `camelCase` on the wire, so an agent and a
//! viewer written against the HTTP API see `cpuUsage`, `lastSeen`, etc.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::command::CommandKind;

/// Latest stats snapshot reported by an agent.
///
/// Every field defaults to zero so a partial report is still well-formed;
/// the registry treats an absent metric as 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceStats {
    /// CPU usage percentage (0-100)
    pub cpu_usage: f32,
    /// Memory usage percentage (0-100)
    pub memory_usage: f32,
    /// Memory in use, GB
    pub memory_used: f64,
    /// Total memory, GB
    pub memory_total: f64,
    /// CPU temperature, Celsius (0 when no sensor is available)
    pub temperature: f32,
    /// Network inbound rate, KB/s
    pub network_in: f64,
    /// Network outbound rate, KB/s
    pub network_out: f64,
    /// Root filesystem usage percentage (0-100)
    pub disk_usage: f32,
}

/// One entry of a device's process list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessInfo {
    /// Process ID
    pub pid: u32,
    /// Process name
    pub name: String,
    /// Scheduler status (e.g. "running", "sleeping")
    pub status: String,
    /// CPU usage percentage
    pub cpu: f32,
    /// Resident memory, MB
    pub memory: f64,
    /// Human-readable uptime (e.g. "42s", "3h")
    pub uptime: String,
}

/// Telemetry report posted by an agent on every poll tick.
///
/// Only `id` is required; all other fields are optional so an agent can
/// send a minimal heartbeat. The hardware snapshot is opaque to the
/// coordinator and stored verbatim.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelemetryReport {
    /// Stable device identity
    pub id: String,
    /// Display name (defaults to the identity when never reported)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Operating system description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    /// Latest stats snapshot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<DeviceStats>,
    /// Latest process list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processes: Option<Vec<ProcessInfo>>,
    /// Hardware snapshot, opaque to the coordinator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardware: Option<serde_json::Value>,
}

/// Coordinator response to a telemetry report.
///
/// The command fields are present only when a pending command existed for
/// the reporting device; the mailbox slot is consumed by this response, so
/// no command is ever delivered twice.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryResponse {
    /// "success" on accepted reports
    pub status: String,
    /// Pending command, if one was queued
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<CommandKind>,
    /// Update source location (update commands only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_url: Option<String>,
    /// Update credential (update commands only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl TelemetryResponse {
    /// Response carrying no command.
    pub fn ack() -> Self {
        Self {
            status: "success".to_string(),
            command: None,
            repo_url: None,
            token: None,
        }
    }
}

/// Derived presence of a device.
///
/// Never stored; recomputed from the heartbeat age on every read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    /// A report arrived within the offline threshold
    Online,
    /// No report for longer than the offline threshold
    Offline,
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceStatus::Online => write!(f, "online"),
            DeviceStatus::Offline => write!(f, "offline"),
        }
    }
}

/// One point of a per-metric history series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    /// Wall-clock label ("HH:MM:SS") of the ingest that produced the point
    pub time: String,
    /// Metric value at that ingest
    pub value: f64,
}

impl HistoryPoint {
    /// Create a new history point.
    pub fn new(time: impl Into<String>, value: f64) -> Self {
        Self {
            time: time.into(),
            value,
        }
    }
}

/// Per-device history series, one buffer per charted metric.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceHistory {
    /// CPU usage over time
    pub cpu: Vec<HistoryPoint>,
    /// Memory usage over time
    pub memory: Vec<HistoryPoint>,
    /// Network inbound rate over time
    pub network: Vec<HistoryPoint>,
}

/// Read-time projection of a device record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceView {
    /// Stable device identity
    pub id: String,
    /// Display name
    pub name: String,
    /// Operating system description
    pub os: String,
    /// Source address of the last report, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    /// Derived presence
    pub status: DeviceStatus,
    /// Unix timestamp (seconds) of the last report
    pub last_seen: u64,
    /// Latest stats snapshot
    pub stats: DeviceStats,
    /// Latest process list
    pub processes: Vec<ProcessInfo>,
    /// Hardware snapshot, opaque
    pub hardware: serde_json::Value,
    /// Per-metric history series
    pub history: DeviceHistory,
}
