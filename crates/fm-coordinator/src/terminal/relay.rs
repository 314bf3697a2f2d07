//! Relay-backed terminal session
//!
//! No process runs on the coordinator for these: the device's shell lives
//! on the device, and the session is nothing but a buffer pair bridged by
//! the device's own sync polls. The viewer writes into `input`, the device
//! drains it on its next sync; the device posts output, the viewer drains
//! it on its next read.

use crate::terminal::buffer::ChunkBuffer;

/// Buffer pair backing a relayed session.
#[derive(Debug)]
pub struct RelaySession {
    /// Viewer keystrokes awaiting the device's next sync
    input: ChunkBuffer,
    /// Device output awaiting the viewer's next read
    output: ChunkBuffer,
}

impl RelaySession {
    /// Create an empty session with the given per-direction byte cap.
    pub fn new(buffer_limit: usize) -> Self {
        Self {
            input: ChunkBuffer::new(buffer_limit),
            output: ChunkBuffer::new(buffer_limit),
        }
    }

    /// Queue viewer input for the device's next sync.
    pub fn write_input(&self, data: String) {
        self.input.push(data);
    }

    /// Drain everything the device has produced since the previous read.
    pub fn read_output(&self) -> String {
        self.output.drain()
    }

    /// One device sync cycle: append the device's output, hand back the
    /// accumulated input. Each side of the exchange is atomic on its own
    /// buffer, so a concurrent viewer read never sees a partial append.
    pub fn sync(&self, device_output: String) -> String {
        self.output.push(device_output);
        self.input.drain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_round_trip() {
        let session = RelaySession::new(64 * 1024);

        session.write_input("ls\n".to_string());
        assert_eq!(session.sync(String::new()), "ls\n");

        assert_eq!(session.sync("total 0\n".to_string()), "");
        assert_eq!(session.read_output(), "total 0\n");

        // Both buffers drained
        assert_eq!(session.sync(String::new()), "");
        assert_eq!(session.read_output(), "");
    }

    #[test]
    fn test_input_accumulates_between_syncs() {
        let session = RelaySession::new(64 * 1024);
        session.write_input("ec".to_string());
        session.write_input("ho hi\n".to_string());
        assert_eq!(session.sync(String::new()), "echo hi\n");
    }

    #[test]
    fn test_sync_with_no_viewer_input_returns_empty() {
        let session = RelaySession::new(64 * 1024);
        // An agent may sync many cycles before the first keystroke
        for _ in 0..10 {
            assert_eq!(session.sync(String::new()), "");
        }
    }
}
