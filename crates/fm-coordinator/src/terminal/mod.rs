//! Terminal session manager
//!
//! Owns zero-or-one session per device identity. The coordinator's own
//! reserved identity is backed by a real pseudo-terminal ([`LocalSession`]);
//! every other identity is backed by a buffer pair bridged through the
//! device's poll loop ([`RelaySession`]).
//!
//! Structural mutations of the session table (insert/remove) are serialized
//! by one async lock so a `start` racing another `start` or `stop` can never
//! leave two live sessions (or a leaked reader) for one identity. Buffer
//! traffic takes only the session's own locks.

pub mod buffer;
mod local;
mod relay;

pub use local::LocalSession;
pub use relay::RelaySession;

use std::sync::Arc;

use dashmap::DashMap;

use fm_core::DeviceId;
use fm_protocol::SessionMode;

enum Backing {
    Local(LocalSession),
    Relay(RelaySession),
}

/// One live terminal session.
pub struct TerminalSession {
    mode: SessionMode,
    backing: Backing,
}

impl TerminalSession {
    /// Mode this session was given on start.
    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    fn write_input(&self, data: String) {
        match &self.backing {
            Backing::Local(local) => local.write_input(&data),
            Backing::Relay(relay) => relay.write_input(data),
        }
    }

    fn read_output(&self) -> String {
        match &self.backing {
            Backing::Local(local) => local.read_output(),
            Backing::Relay(relay) => relay.read_output(),
        }
    }

    fn is_closed(&self) -> bool {
        match &self.backing {
            Backing::Local(local) => local.is_closed(),
            Backing::Relay(_) => false,
        }
    }

    async fn teardown(&self) {
        if let Backing::Local(local) = &self.backing {
            local.teardown().await;
        }
    }
}

/// Session table keyed by device identity.
pub struct TerminalManager {
    sessions: DashMap<DeviceId, Arc<TerminalSession>>,
    /// Serializes insert/remove so replace-on-start is atomic
    structural: tokio::sync::Mutex<()>,
    local_identity: DeviceId,
    local_shell: Option<String>,
    buffer_limit: usize,
}

impl TerminalManager {
    /// Create an empty manager.
    ///
    /// `local_identity` is the one identity given a PTY-backed session;
    /// `buffer_limit` caps each buffered direction of every session.
    pub fn new(
        local_identity: DeviceId,
        local_shell: Option<String>,
        buffer_limit: usize,
    ) -> Self {
        Self {
            sessions: DashMap::new(),
            structural: tokio::sync::Mutex::new(()),
            local_identity,
            local_shell,
            buffer_limit,
        }
    }

    /// Start a fresh session for the identity, force-closing any live one
    /// first. Returns the mode the new session was given.
    ///
    /// The reserved local identity gets a PTY session when the host can
    /// provide one, falling back to relay otherwise.
    pub async fn start(&self, id: &DeviceId) -> SessionMode {
        let _guard = self.structural.lock().await;

        if let Some((_, old)) = self.sessions.remove(id) {
            tracing::info!("Replacing live terminal session for {}", id);
            old.teardown().await;
        }

        let session = if *id == self.local_identity {
            match LocalSession::spawn(self.local_shell.as_deref(), self.buffer_limit) {
                Ok(local) => TerminalSession {
                    mode: SessionMode::Local,
                    backing: Backing::Local(local),
                },
                Err(e) => {
                    tracing::warn!("No PTY for {}, falling back to relay: {}", id, e);
                    self.relay_session()
                }
            }
        } else {
            self.relay_session()
        };

        let mode = session.mode();
        tracing::info!("Started {} terminal session for {}", mode, id);
        self.sessions.insert(id.clone(), Arc::new(session));
        mode
    }

    /// Queue viewer input. No session is a silent no-op: a keystroke
    /// arriving just after a session closed is an expected race.
    pub fn write_input(&self, id: &DeviceId, data: String) {
        match self.get(id) {
            Some(session) => session.write_input(data),
            None => tracing::debug!("Discarding input for {}: no live session", id),
        }
    }

    /// Atomically drain the viewer-facing output buffer.
    ///
    /// When the backing shell of a local session is gone the session is
    /// removed after this final drain; the caller sees the remaining
    /// output now and a no-op on the next call.
    pub async fn read_output(&self, id: &DeviceId) -> String {
        let Some(session) = self.get(id) else {
            return String::new();
        };

        let output = session.read_output();

        if session.is_closed() {
            tracing::info!("Backing shell for {} exited, closing session", id);
            {
                let _guard = self.structural.lock().await;
                let still_current = self
                    .sessions
                    .get(id)
                    .map(|entry| Arc::ptr_eq(entry.value(), &session))
                    .unwrap_or(false);
                if still_current {
                    self.sessions.remove(id);
                }
            }
            session.teardown().await;
        }

        output
    }

    /// One relay sync cycle, called by the device's own poll loop. Appends
    /// the device's output, drains and returns the pending input. No live
    /// relay session yields empty input and discards the output.
    pub fn sync(&self, id: &DeviceId, device_output: String) -> String {
        match self.get(id) {
            Some(session) => match &session.backing {
                Backing::Relay(relay) => relay.sync(device_output),
                Backing::Local(_) => {
                    tracing::debug!("Ignoring sync for local session {}", id);
                    String::new()
                }
            },
            None => String::new(),
        }
    }

    /// Stop and remove the identity's session, discarding undelivered
    /// output. Returns whether a session existed.
    pub async fn stop(&self, id: &DeviceId) -> bool {
        let removed = {
            let _guard = self.structural.lock().await;
            self.sessions.remove(id)
        };

        match removed {
            Some((_, session)) => {
                session.teardown().await;
                tracing::info!("Stopped terminal session for {}", id);
                true
            }
            None => false,
        }
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Check if no sessions are live.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn get(&self, id: &DeviceId) -> Option<Arc<TerminalSession>> {
        self.sessions.get(id).map(|entry| Arc::clone(entry.value()))
    }

    fn relay_session(&self) -> TerminalSession {
        TerminalSession {
            mode: SessionMode::Relay,
            backing: Backing::Relay(RelaySession::new(self.buffer_limit)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> TerminalManager {
        TerminalManager::new(DeviceId::new("server"), None, 64 * 1024)
    }

    #[tokio::test]
    async fn test_remote_identity_gets_relay() {
        let manager = manager();
        assert_eq!(manager.start(&DeviceId::new("pi-01")).await, SessionMode::Relay);
    }

    #[tokio::test]
    async fn test_relay_round_trip_through_manager() {
        let manager = manager();
        let id = DeviceId::new("pi-01");
        manager.start(&id).await;

        manager.write_input(&id, "ls\n".to_string());
        assert_eq!(manager.sync(&id, String::new()), "ls\n");

        manager.sync(&id, "total 0\n".to_string());
        assert_eq!(manager.read_output(&id).await, "total 0\n");

        // Both buffers empty after their drains
        assert_eq!(manager.sync(&id, String::new()), "");
        assert_eq!(manager.read_output(&id).await, "");
    }

    #[tokio::test]
    async fn test_restart_leaves_single_session() {
        let manager = manager();
        let id = DeviceId::new("pi-01");

        manager.start(&id).await;
        manager.write_input(&id, "stale\n".to_string());
        manager.start(&id).await;

        assert_eq!(manager.len(), 1);
        // The replacement session starts with clean buffers
        assert_eq!(manager.sync(&id, String::new()), "");
    }

    #[tokio::test]
    async fn test_missing_session_is_noop() {
        let manager = manager();
        let id = DeviceId::new("ghost");

        manager.write_input(&id, "ls\n".to_string());
        assert_eq!(manager.read_output(&id).await, "");
        assert_eq!(manager.sync(&id, "output\n".to_string()), "");
        assert!(!manager.stop(&id).await);
    }

    #[tokio::test]
    async fn test_stop_discards_buffered_output() {
        let manager = manager();
        let id = DeviceId::new("pi-01");

        manager.start(&id).await;
        manager.sync(&id, "undelivered\n".to_string());
        assert!(manager.stop(&id).await);

        assert!(manager.is_empty());
        assert_eq!(manager.read_output(&id).await, "");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_sync_against_local_session_is_noop() {
        let manager = TerminalManager::new(DeviceId::new("server"), Some("/bin/sh".to_string()), 64 * 1024);
        let id = DeviceId::new("server");

        let mode = manager.start(&id).await;
        if mode != SessionMode::Local {
            eprintln!("skipping: no PTY available");
            return;
        }

        // Only relay sessions take part in the sync exchange; a sync that
        // races a session's mode returns empty input and drops the output
        assert_eq!(manager.sync(&id, "x".to_string()), "");
        assert_eq!(manager.sync(&id, String::new()), "");

        assert!(manager.stop(&id).await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_local_identity_gets_pty_session() {
        let manager = TerminalManager::new(DeviceId::new("server"), Some("/bin/sh".to_string()), 64 * 1024);
        let id = DeviceId::new("server");

        let mode = manager.start(&id).await;
        if mode != SessionMode::Local {
            eprintln!("skipping: no PTY available");
            return;
        }

        // Restarting must not leak the first session's reader
        manager.start(&id).await;
        assert_eq!(manager.len(), 1);

        assert!(manager.stop(&id).await);
        assert!(manager.is_empty());
    }
}
