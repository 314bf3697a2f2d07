//! Core domain types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a monitored device
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(pub String);

impl DeviceId {
    /// Create a new device ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the raw ID string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identity is usable as a registry key
    pub fn is_valid(&self) -> bool {
        !self.0.trim().is_empty()
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for DeviceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_id_display() {
        let id = DeviceId::new("pi-01");
        assert_eq!(id.to_string(), "pi-01");
        assert_eq!(id.as_str(), "pi-01");
    }

    #[test]
    fn test_device_id_validity() {
        assert!(DeviceId::new("pi-01").is_valid());
        assert!(!DeviceId::new("").is_valid());
        assert!(!DeviceId::new("   ").is_valid());
    }
}
