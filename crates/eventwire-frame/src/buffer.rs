use bytes::{Buf, Bytes, BytesMut};

use crate::separator;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Per-connection accumulator for bytes not yet resolved into a frame.
///
/// Remembers how far it has already scanned, so a long frame arriving in
/// many small chunks is searched once rather than once per chunk.
#[derive(Debug)]
pub struct ReceiveBuffer {
    buf: BytesMut,
    /// Offset below which no separator can start.
    scanned: usize,
}

impl ReceiveBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_BUFFER_CAPACITY)
    }

    /// Create an empty buffer with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            scanned: 0,
        }
    }

    /// Append a chunk as it arrived from the transport.
    pub fn append(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Remove and return everything before the next complete `separator`.
    ///
    /// The separator itself is discarded. Returns `None`, leaving the buffer
    /// untouched, when no complete separator is buffered.
    pub fn take_until(&mut self, separator: &[u8]) -> Option<Bytes> {
        match separator::find(&self.buf, separator, self.scanned) {
            Some(pos) => {
                let frame = self.buf.split_to(pos).freeze();
                self.buf.advance(separator.len());
                self.scanned = 0;
                Some(frame)
            }
            None => {
                self.scanned = self
                    .buf
                    .len()
                    .saturating_sub(separator.len().saturating_sub(1));
                None
            }
        }
    }

    /// Remove and return whatever is left, or `None` if the buffer is empty.
    pub fn take_remaining(&mut self) -> Option<Bytes> {
        self.scanned = 0;
        if self.buf.is_empty() {
            return None;
        }
        Some(self.buf.split().freeze())
    }

    /// Number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether no bytes are buffered.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Drop all buffered bytes.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.scanned = 0;
    }
}

impl Default for ReceiveBuffer {
    fn default() -> Self {
        Self::new()
    }
}
