//! fm-coordinator: Central daemon of the FleetMon control plane
//!
//! The coordinator tracks a fleet of agents that only ever poll outbound.
//! It holds the device registry fed by telemetry reports, the per-device
//! command mailbox whose contents ride the next poll response, and the
//! terminal session manager bridging interactive shells over the same
//! poll channel (or over a local pseudo-terminal for the coordinator's
//! own host).

pub mod history;
pub mod mailbox;
pub mod registry;
pub mod sampler;
pub mod server;
pub mod state;
pub mod terminal;
pub mod update;

pub use state::CoordinatorState;
