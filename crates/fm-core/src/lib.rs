//! fm-core: Core abstractions and configuration for FleetMon
//!
//! This crate provides shared types, configuration structures, time helpers,
//! and the host metrics collector used by the coordinator and agent daemons.

pub mod config;
pub mod error;
pub mod metrics;
pub mod time;
pub mod types;

pub use error::ConfigError;
pub use types::DeviceId;
