//! Shared coordinator state

use std::sync::Arc;

use fm_core::config::CoordinatorConfig;
use fm_core::DeviceId;

use crate::mailbox::CommandMailbox;
use crate::registry::DeviceRegistry;
use crate::terminal::TerminalManager;
use crate::update::UpdateSettings;

/// Everything the HTTP handlers and background loops share.
///
/// Cloning is cheap; every component is behind an `Arc`.
#[derive(Clone)]
pub struct CoordinatorState {
    pub config: Arc<CoordinatorConfig>,
    pub registry: Arc<DeviceRegistry>,
    pub mailbox: Arc<CommandMailbox>,
    pub terminals: Arc<TerminalManager>,
    pub updates: Arc<UpdateSettings>,
}

impl CoordinatorState {
    /// Build fresh state from configuration.
    pub fn new(config: CoordinatorConfig) -> Self {
        let registry = DeviceRegistry::new(config.offline_threshold, config.history_capacity);
        let terminals = TerminalManager::new(
            DeviceId::new(config.local_identity.clone()),
            config.local_shell.clone(),
            config.relay_buffer_limit,
        );

        Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
            mailbox: Arc::new(CommandMailbox::new()),
            terminals: Arc::new(terminals),
            updates: Arc::new(UpdateSettings::new()),
        }
    }

    /// Reserved identity of the coordinator host itself.
    pub fn local_identity(&self) -> DeviceId {
        DeviceId::new(self.config.local_identity.clone())
    }
}
