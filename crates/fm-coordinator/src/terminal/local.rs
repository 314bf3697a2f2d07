//! Local pseudo-terminal session
//!
//! Backs the coordinator host's own terminal with a real PTY and child
//! shell via the portable-pty crate. A dedicated blocking reader task pumps
//! the PTY output into the session's chunk buffer; killing the child on
//! teardown forces the blocked read to return, which bounds stop latency.

use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::terminal::buffer::ChunkBuffer;

/// How long teardown waits for the reader task after killing the shell.
const READER_JOIN_TIMEOUT: Duration = Duration::from_millis(500);

/// A live pseudo-terminal session on the coordinator host.
pub struct LocalSession {
    /// Writer to the PTY master; input goes straight to the shell
    writer: Mutex<Box<dyn Write + Send>>,
    /// Child shell process
    child: Mutex<Box<dyn Child + Send + Sync>>,
    /// Master side kept alive for the session's lifetime
    _master: Mutex<Box<dyn MasterPty + Send>>,
    /// Shell output awaiting the viewer's next read
    output: Arc<ChunkBuffer>,
    /// Set by the reader on EOF or read failure
    closed: Arc<AtomicBool>,
    /// Cancels the reader task
    cancel: CancellationToken,
    /// Reader task handle, taken on teardown
    reader_task: Mutex<Option<JoinHandle<()>>>,
}

impl LocalSession {
    /// Open a PTY, spawn the shell, and start the output reader.
    pub fn spawn(shell: Option<&str>, buffer_limit: usize) -> Result<Self> {
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
            "Spawned local shell {} with PID {:?}",
            shell_path,
            child.process_id()
        );

        // The master only sees EOF once every slave handle is gone
        drop(pair.slave);

        let reader = pair
            .master
            .try_clone_reader()
            .context("Failed to clone PTY reader")?;
        let writer = pair
            .master
            .take_writer()
            .context("Failed to take PTY writer")?;

        let output = Arc::new(ChunkBuffer::new(buffer_limit));
        let closed = Arc::new(AtomicBool::new(false));
        let cancel = CancellationToken::new();
        let reader_task = spawn_output_reader(
            reader,
            Arc::clone(&output),
            Arc::clone(&closed),
            cancel.clone(),
        );

        Ok(Self {
            writer: Mutex::new(writer),
            child: Mutex::new(child),
            _master: Mutex::new(pair.master),
            output,
            closed,
            cancel,
            reader_task: Mutex::new(Some(reader_task)),
        })
    }

    /// Write viewer input straight to the shell, best effort. A dead shell
    /// simply stops producing output; closure is detected by the reader.
    pub fn write_input(&self, data: &str) {
        let mut writer = self.writer.lock().expect("pty writer lock poisoned");
        if let Err(e) = writer.write_all(data.as_bytes()).and_then(|_| writer.flush()) {
            tracing::debug!("Ignoring write to dead local shell: {}", e);
        }
    }

    /// Drain everything the shell has produced since the previous read.
    pub fn read_output(&self) -> String {
        self.output.drain()
    }

    /// Whether the backing shell is gone. Only set after the reader has
    /// consumed the final output, so draining after this never loses data.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Stop the session: kill the shell, then cancel and join the reader.
    ///
    /// Kill first: the blocked read returns on EOF, so the join completes
    /// within the poll bound rather than waiting for more output.
    pub async fn teardown(&self) {
        self.cancel.cancel();
        {
            let mut child = self.child.lock().expect("pty child lock poisoned");
            if let Err(e) = child.kill() {
                tracing::debug!("Kill on teardown failed (already exited?): {}", e);
            }
        }

        let task = self
            .reader_task
            .lock()
            .expect("reader task lock poisoned")
            .take();
        if let Some(task) = task {
            if tokio::time::timeout(READER_JOIN_TIMEOUT, task).await.is_err() {
                tracing::warn!("Local session reader did not stop within {:?}", READER_JOIN_TIMEOUT);
            }
        }
    }
}

/// Pump PTY output into the session buffer until EOF, failure, or cancel.
fn spawn_output_reader(
    mut reader: Box<dyn Read + Send>,
    output: Arc<ChunkBuffer>,
    closed: Arc<AtomicBool>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        let mut buf = [0u8; 4096];

        loop {
            if cancel.is_cancelled() {
                tracing::debug!("Local session reader cancelled");
                break;
            }

            match reader.read(&mut buf) {
                Ok(0) => {
                    tracing::debug!("Local shell EOF");
                    break;
                }
                Ok(n) => {
                    output.push(String::from_utf8_lossy(&buf[..n]).into_owned());
                }
                Err(e) => {
                    if !cancel.is_cancelled() {
                        tracing::debug!("Local shell read ended: {}", e);
                    }
                    break;
                }
            }
        }

        closed.store(true, Ordering::SeqCst);
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    async fn wait_for_output(session: &LocalSession) -> String {
        let mut collected = String::new();
        for _ in 0..50 {
            collected.push_str(&session.read_output());
            if !collected.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        collected
    }

    #[tokio::test]
    async fn test_local_session_echoes_input() {
        let session = match LocalSession::spawn(Some("/bin/sh"), 64 * 1024) {
            Ok(session) => session,
            Err(e) => {
                eprintln!("skipping: no PTY available ({})", e);
                return;
            }
        };

        session.write_input("echo fleetmon-test\n");
        let output = wait_for_output(&session).await;
        assert!(
            output.contains("fleetmon-test"),
            "unexpected output: {:?}",
            output
        );

        session.teardown().await;
    }

    #[tokio::test]
    async fn test_exit_closes_session() {
        let session = match LocalSession::spawn(Some("/bin/sh"), 64 * 1024) {
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

    #[tokio::test]
    async fn test_teardown_joins_reader() {
        let session = match LocalSession::spawn(Some("/bin/sh"), 64 * 1024) {
            Ok(session) => session,
            Err(e) => {
                eprintln!("skipping: no PTY available ({})", e);
                return;
            }
        };

        // Teardown while the reader is blocked in its read
        session.teardown().await;
        assert!(session.reader_task.lock().unwrap().is_none());
    }
}
