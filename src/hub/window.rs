//! # Window Buffer
//!
//! Byte accumulator shared by exactly two parties: a speech connection's
//! reader (appends) and its ticker (drains). Both operations take the same
//! lock, so a drain sees either all or none of any single append.

use parking_lot::Mutex;

#[derive(Debug, Default)]
pub struct WindowBuffer {
    bytes: Mutex<Vec<u8>>,
}

impl WindowBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk. Returns the window size after the append.
    pub fn append(&self, chunk: &[u8]) -> usize {
        let mut bytes = self.bytes.lock();
        bytes.extend_from_slice(chunk);
        bytes.len()
    }

    /// Swap the accumulated bytes for an empty buffer and hand them back.
    pub fn take(&self) -> Vec<u8> {
        std::mem::take(&mut *self.bytes.lock())
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.lock().is_empty()
    }
}
