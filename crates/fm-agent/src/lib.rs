//! fm-agent: Device-side daemon of the FleetMon control plane
//!
//! The agent never listens; everything is outbound polling. A telemetry
//! loop posts host metrics on a fixed interval and executes whatever
//! command rides the response, while a faster sync loop bridges the
//! device's shell into a relay terminal session on the coordinator.

pub mod poller;
pub mod power;
pub mod terminal;
