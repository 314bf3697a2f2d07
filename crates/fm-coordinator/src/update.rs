//! Update trigger settings
//!
//! The multi-stage self-replacement mechanism lives on the devices; the
//! coordinator only remembers where updates come from and turns an operator
//! "execute" into an update command in the mailbox.

use std::sync::RwLock;

use fm_core::time::current_time_secs;
use fm_protocol::UpdateStatus;

use crate::mailbox::PendingCommand;

#[derive(Debug, Default)]
struct Inner {
    repo_url: String,
    token: Option<String>,
    last_checked: u64,
}

/// Shared update source configuration.
pub struct UpdateSettings {
    inner: RwLock<Inner>,
}

impl UpdateSettings {
    /// Create settings with no repository configured.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Replace the update source.
    pub fn set_repo(&self, url: String, token: Option<String>) {
        let mut inner = self.inner.write().expect("update settings lock poisoned");
        inner.repo_url = url;
        inner.token = token;
    }

    /// Current settings, with the credential redacted to a flag. Records
    /// the check time.
    pub fn check(&self) -> UpdateStatus {
        let mut inner = self.inner.write().expect("update settings lock poisoned");
        inner.last_checked = current_time_secs();
        UpdateStatus {
            repo_url: inner.repo_url.clone(),
            token_set: inner.token.is_some(),
            last_checked: inner.last_checked,
        }
    }

    /// Build the mailbox command for the configured source, or None when no
    /// repository is set.
    pub fn command(&self) -> Option<PendingCommand> {
        let inner = self.inner.read().expect("update settings lock poisoned");
        if inner.repo_url.is_empty() {
            return None;
        }
        Some(PendingCommand::Update {
            repo_url: inner.repo_url.clone(),
            token: inner.token.clone(),
        })
    }
}

impl Default for UpdateSettings {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_requires_configured_repo() {
        let settings = UpdateSettings::new();
        assert!(settings.command().is_none());

        settings.set_repo("https://example.com/repo".to_string(), None);
        match settings.command() {
            Some(PendingCommand::Update { repo_url, .. }) => {
                assert_eq!(repo_url, "https://example.com/repo");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_check_redacts_token() {
        let settings = UpdateSettings::new();
        settings.set_repo("https://example.com/repo".to_string(), Some("secret".to_string()));

        let status = settings.check();
        assert!(status.token_set);
        assert!(status.last_checked > 0);
        assert_eq!(status.repo_url, "https://example.com/repo");
    }
}
