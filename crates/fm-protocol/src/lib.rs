//! fm-protocol: Wire protocol for the FleetMon poll channel
//!
//! Agents never accept inbound connections; every exchange is an outbound
//! request from an agent or a viewer against the coordinator. This crate
//! defines the JSON bodies of those exchanges.
//!
//! # Message Flow
//!
//! Typical exchanges:
//!
//! 1. Agent posts [`TelemetryReport`] on a fixed interval
//! 2. Coordinator replies with [`TelemetryResponse`], piggybacking at most
//!    one pending command (power action or update trigger)
//! 3. Viewers read [`DeviceView`] projections and queue commands
//! 4. While a relay terminal session is live, the agent additionally
//!    exchanges [`SyncRequest`]/[`SyncResponse`] on a faster interval

mod command;
mod telemetry;
mod terminal;

pub use command::{CommandKind, PowerAction, PowerRequest, UpdateExecuteRequest, UpdateRepoRequest, UpdateStatus};
pub use telemetry::{
    DeviceHistory, DeviceStats, DeviceStatus, DeviceView, HistoryPoint, ProcessInfo,
    TelemetryReport, TelemetryResponse,
};
pub use terminal::{
    SessionMode, StatusResponse, SyncRequest, SyncResponse, TerminalInputRequest,
    TerminalOutputResponse, TerminalStartResponse,
};
