//! Bounded chunk buffer shared by both session kinds
//!
//! One direction of a terminal session's buffering: chunks go in as they
//! are produced and come out in one atomic drain. A byte cap keeps a
//! stalled peer (a viewer that stopped reading, an agent that stopped
//! polling) from growing the buffer without bound; on overflow the oldest
//! chunks are dropped so the reader resumes with the most recent data.

use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug, Default)]
struct Inner {
    chunks: VecDeque<String>,
    bytes: usize,
}

/// FIFO of text chunks with a byte cap and drop-oldest overflow.
#[derive(Debug)]
pub struct ChunkBuffer {
    inner: Mutex<Inner>,
    limit: usize,
}

impl ChunkBuffer {
    /// Create an empty buffer capped at `limit` bytes.
    pub fn new(limit: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            limit,
        }
    }

    /// Append a chunk, evicting oldest chunks if the cap would be exceeded.
    ///
    /// A single chunk larger than the cap is still accepted (the buffer
    /// then holds just that chunk); splitting it would break the chunk
    /// ordering contract for no practical gain.
    pub fn push(&self, chunk: String) {
        if chunk.is_empty() {
            return;
        }

        let mut inner = self.inner.lock().expect("chunk buffer lock poisoned");
        while inner.bytes + chunk.len() > self.limit {
            match inner.chunks.pop_front() {
                Some(dropped) => {
                    inner.bytes -= dropped.len();
                    tracing::debug!("Dropped {} buffered bytes on overflow", dropped.len());
                }
                None => break,
            }
        }
        inner.bytes += chunk.len();
        inner.chunks.push_back(chunk);
    }

    /// Atomically take every chunk, concatenated in production order.
    pub fn drain(&self) -> String {
        let mut inner = self.inner.lock().expect("chunk buffer lock poisoned");
        inner.bytes = 0;
        inner.chunks.drain(..).collect()
    }

    /// Buffered byte count.
    pub fn len_bytes(&self) -> usize {
        self.inner.lock().expect("chunk buffer lock poisoned").bytes
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.len_bytes() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_preserves_order_and_resets() {
        let buffer = ChunkBuffer::new(1024);
        buffer.push("ls".to_string());
        buffer.push(" -la\n".to_string());

        assert_eq!(buffer.drain(), "ls -la\n");
        assert!(buffer.is_empty());
        assert_eq!(buffer.drain(), "");
    }

    #[test]
    fn test_empty_chunks_are_ignored() {
        let buffer = ChunkBuffer::new(1024);
        buffer.push(String::new());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_overflow_drops_oldest() {
        let buffer = ChunkBuffer::new(8);
        buffer.push("aaaa".to_string());
        buffer.push("bbbb".to_string());
        buffer.push("cc".to_string());

        // "aaaa" was dropped to make room
        assert_eq!(buffer.drain(), "bbbbcc");
    }

    #[test]
    fn test_oversized_chunk_still_accepted() {
        let buffer = ChunkBuffer::new(4);
        buffer.push("toolarge".to_string());
        assert_eq!(buffer.drain(), "toolarge");
    }
}
