//! Relay terminal bridge
//!
//! While the coordinator holds a relay session for this device, the bridge
//! carries it: every sync tick posts the shell output accumulated since the
//! last tick and applies whatever input came back. The shell itself is
//! lazy; nothing is spawned until the first keystroke arrives, and a shell
//! that exits is reaped so the next keystroke starts a fresh one.

use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use fm_core::config::AgentConfig;
use fm_protocol::{SyncRequest, SyncResponse};

/// How long teardown waits for the reader task after killing the shell.
const READER_JOIN_TIMEOUT: Duration = Duration::from_millis(500);

/// A live shell bridged to the coordinator's relay buffers.
struct ShellSession {
    writer: Box<dyn Write + Send>,
    child: Box<dyn Child + Send + Sync>,
    _master: Box<dyn MasterPty + Send>,
    closed: Arc<AtomicBool>,
    cancel: CancellationToken,
    reader_task: Option<JoinHandle<()>>,
}

impl ShellSession {
    /// Open a PTY, spawn the shell, and start pumping output into `output_tx`.
    fn spawn(shell: Option<&str>, output_tx: mpsc::UnboundedSender<String>) -> Result<Self> {
        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(PtySize {
                rows: 24,
                cols: 80,
                pixel_width: 0,
                pixel_height: 0,
            })
            .context("Failed to open PTY")?;

        let shell_path = shell
            .map(str::to_string)
            .or_else(|| std::env::var("SHELL").ok())
            .unwrap_or_else(|| "/bin/sh".to_string());

        let mut cmd = CommandBuilder::new(&shell_path);
        cmd.env("TERM", "xterm-256color");

        let child = pair
            .slave
            .spawn_command(cmd)
            .with_context(|| format!("Failed to spawn shell: {}", shell_path))?;
        tracing::info!(
            "Spawned relay shell {} with PID {:?}",
            shell_path,
            child.process_id()
        );

        // The master only sees EOF once every slave handle is gone
        drop(pair.slave);

        let mut reader = pair
            .master
            .try_clone_reader()
            .context("Failed to clone PTY reader")?;
        let writer = pair
            .master
            .take_writer()
            .context("Failed to take PTY writer")?;

        let closed = Arc::new(AtomicBool::new(false));
        let cancel = CancellationToken::new();

        let reader_closed = Arc::clone(&closed);
        let reader_cancel = cancel.clone();
        let reader_task = tokio::task::spawn_blocking(move || {
            let mut buf = [0u8; 4096];
            loop {
                if reader_cancel.is_cancelled() {
                    break;
                }
                match reader.read(&mut buf) {
                    Ok(0) => {
                        tracing::debug!("Relay shell EOF");
                        break;
                    }
                    Ok(n) => {
                        let chunk = String::from_utf8_lossy(&buf[..n]).into_owned();
                        if output_tx.send(chunk).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        if !reader_cancel.is_cancelled() {
                            tracing::debug!("Relay shell read ended: {}", e);
                        }
                        break;
                    }
                }
            }
            reader_closed.store(true, Ordering::SeqCst);
        });

        Ok(Self {
            writer,
            child,
            _master: pair.master,
            closed,
            cancel,
            reader_task: Some(reader_task),
        })
    }

    fn write_input(&mut self, data: &str) {
        if let Err(e) = self
            .writer
            .write_all(data.as_bytes())
            .and_then(|_| self.writer.flush())
        {
            tracing::debug!("Ignoring write to dead relay shell: {}", e);
        }
    }

    /// Whether the shell is gone. Only set after the reader has forwarded
    /// the final output, so the next sync still delivers it.
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Kill the shell, then join the reader. Killing first forces the
    /// blocked read to EOF, which bounds how long the join can take.
    async fn teardown(mut self) {
        self.cancel.cancel();
        if let Err(e) = self.child.kill() {
            tracing::debug!("Kill on teardown failed (already exited?): {}", e);
        }

        if let Some(task) = self.reader_task.take() {
            if tokio::time::timeout(READER_JOIN_TIMEOUT, task).await.is_err() {
                tracing::warn!(
                    "Relay shell reader did not stop within {:?}",
                    READER_JOIN_TIMEOUT
                );
            }
        }
    }
}

/// Run the sync loop until cancelled.
pub async fn run(config: Arc<AgentConfig>, client: reqwest::Client, cancel: CancellationToken) {
    let identity = config.device_id();
    let url = config.endpoint("/api/terminal/sync");

    let (output_tx, mut output_rx) = mpsc::unbounded_channel::<String>();
    let mut shell: Option<ShellSession> = None;

    tracing::info!("Terminal sync every {:?}", config.sync_interval);

    loop {
        tokio::select! {
            _ = tokio::time::sleep(config.sync_interval) => {}
            _ = cancel.cancelled() => break,
        }

        // Reap an exited shell after its final output has been forwarded
        if shell.as_ref().is_some_and(ShellSession::is_closed) {
            tracing::info!("Relay shell exited");
            if let Some(old) = shell.take() {
                old.teardown().await;
            }
        }

        let mut output = String::new();
        while let Ok(chunk) = output_rx.try_recv() {
            output.push_str(&chunk);
        }

        let request = SyncRequest {
            id: identity.clone(),
            output,
        };
        let input = match post_sync(&client, &url, &request).await {
            Ok(response) => response.input,
            Err(e) => {
                tracing::debug!("Terminal sync failed, retrying next tick: {}", e);
                continue;
            }
        };

        if input.is_empty() {
            continue;
        }

        if shell.is_none() {
            match ShellSession::spawn(config.shell.as_deref(), output_tx.clone()) {
                Ok(session) => shell = Some(session),
                Err(e) => {
                    tracing::warn!("Failed to start relay shell: {:#}", e);
                    continue;
                }
            }
        }
        if let Some(session) = shell.as_mut() {
            session.write_input(&input);
        }
    }

    if let Some(session) = shell.take() {
        session.teardown().await;
    }
    tracing::debug!("Terminal sync loop stopped");
}

async fn post_sync(
    client: &reqwest::Client,
    url: &str,
    request: &SyncRequest,
) -> anyhow::Result<SyncResponse> {
    let response = client
        .post(url)
        .json(request)
        .send()
        .await?
        .error_for_status()?
        .json::<SyncResponse>()
        .await?;
    Ok(response)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_shell_round_trip_and_teardown() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut session = match ShellSession::spawn(Some("/bin/sh"), tx) {
            Ok(session) => session,
            Err(e) => {
                eprintln!("skipping: no PTY available ({})", e);
                return;
            }
        };

        session.write_input("echo bridge-test\n");

        let mut collected = String::new();
        for _ in 0..50 {
            while let Ok(chunk) = rx.try_recv() {
                collected.push_str(&chunk);
            }
            if collected.contains("bridge-test") {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(collected.contains("bridge-test"), "got: {:?}", collected);

        session.teardown().await;
    }

    #[tokio::test]
    async fn test_exited_shell_reports_closed() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut session = match ShellSession::spawn(Some("/bin/sh"), tx) {
            Ok(session) => session,
            Err(e) => {
                eprintln!("skipping: no PTY available ({})", e);
                return;
            }
        };

        session.write_input("exit\n");
        for _ in 0..50 {
            if session.is_closed() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(session.is_closed());

        session.teardown().await;
    }
}
