//! Per-device command mailbox
//!
//! Agents cannot be pushed to, so operator actions are parked here and ride
//! the next telemetry response. Each device has a single slot: a newer
//! command overwrites an unconsumed one, and draining is an atomic
//! read-and-delete, so a command is delivered at most once.

use std::fmt;

use dashmap::DashMap;

use fm_core::DeviceId;
use fm_protocol::PowerAction;

/// A directive awaiting a device's next poll.
#[derive(Clone, PartialEq, Eq)]
pub enum PendingCommand {
    /// Restart the device
    Reboot,
    /// Power the device off
    Shutdown,
    /// Pull and apply a self-update from the given source
    Update {
        /// Repository the update is pulled from
        repo_url: String,
        /// Optional access credential
        token: Option<String>,
    },
}

/// Hand-written so the update credential never reaches a log line; only
/// its presence is shown.
impl fmt::Debug for PendingCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PendingCommand::Reboot => f.write_str("Reboot"),
            PendingCommand::Shutdown => f.write_str("Shutdown"),
            PendingCommand::Update { repo_url, token } => f
                .debug_struct("Update")
                .field("repo_url", repo_url)
                .field("token_set", &token.is_some())
                .finish(),
        }
    }
}

impl From<PowerAction> for PendingCommand {
    fn from(action: PowerAction) -> Self {
        match action {
            PowerAction::Reboot => PendingCommand::Reboot,
            PowerAction::Shutdown => PendingCommand::Shutdown,
        }
    }
}

/// Single-slot mailboxes keyed by device identity.
///
/// The map gives per-identity granularity; queueing a command for one
/// device never blocks another device's drain.
pub struct CommandMailbox {
    slots: DashMap<DeviceId, PendingCommand>,
}

impl CommandMailbox {
    /// Create an empty mailbox table.
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
        }
    }

    /// Queue a command, overwriting any unconsumed one (last write wins).
    pub fn enqueue(&self, id: DeviceId, command: PendingCommand) {
        if let Some(previous) = self.slots.insert(id.clone(), command) {
            tracing::debug!("Overwrote unconsumed command {:?} for {}", previous, id);
        }
    }

    /// Atomically take the pending command, if any.
    pub fn drain(&self, id: &DeviceId) -> Option<PendingCommand> {
        self.slots.remove(id).map(|(_, command)| command)
    }

    /// Number of devices with a pending command.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl Default for CommandMailbox {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_is_exactly_once() {
        let mailbox = CommandMailbox::new();
        let id = DeviceId::new("pi-01");

        mailbox.enqueue(id.clone(), PendingCommand::Reboot);
        assert_eq!(mailbox.drain(&id), Some(PendingCommand::Reboot));
        assert_eq!(mailbox.drain(&id), None);
    }

    #[test]
    fn test_newer_command_overwrites() {
        let mailbox = CommandMailbox::new();
        let id = DeviceId::new("pi-01");

        mailbox.enqueue(id.clone(), PendingCommand::Reboot);
        mailbox.enqueue(id.clone(), PendingCommand::Shutdown);

        assert_eq!(mailbox.drain(&id), Some(PendingCommand::Shutdown));
        assert_eq!(mailbox.drain(&id), None);
    }

    #[test]
    fn test_slots_are_per_device() {
        let mailbox = CommandMailbox::new();
        mailbox.enqueue(DeviceId::new("a"), PendingCommand::Reboot);
        mailbox.enqueue(DeviceId::new("b"), PendingCommand::Shutdown);

        assert_eq!(mailbox.drain(&DeviceId::new("a")), Some(PendingCommand::Reboot));
        assert_eq!(mailbox.drain(&DeviceId::new("b")), Some(PendingCommand::Shutdown));
    }

    #[test]
    fn test_debug_format_redacts_update_token() {
        let command = PendingCommand::Update {
            repo_url: "https://example.com/repo".to_string(),
            token: Some("super-secret-credential".to_string()),
        };

        let rendered = format!("{:?}", command);
        assert!(!rendered.contains("super-secret-credential"), "leaked: {}", rendered);
        assert!(rendered.contains("token_set: true"));
        assert!(rendered.contains("https://example.com/repo"));
    }

    #[test]
    fn test_update_command_carries_source() {
        let mailbox = CommandMailbox::new();
        let id = DeviceId::new("pi-01");

        mailbox.enqueue(
            id.clone(),
            PendingCommand::Update {
                repo_url: "https://example.com/repo".to_string(),
                token: None,
            },
        );

        match mailbox.drain(&id) {
            Some(PendingCommand::Update { repo_url, token }) => {
                assert_eq!(repo_url, "https://example.com/repo");
                assert!(token.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
