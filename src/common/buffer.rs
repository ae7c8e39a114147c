// src/common/buffer.rs

use heapless::Vec;

/// Default capacity for command transactions.
pub const COMMAND_BUFFER_SIZE: usize = 512;
/// Default capacity for payload aggregation.
pub const PAYLOAD_BUFFER_SIZE: usize = 1024;

/// Append-only receive buffer with a fixed capacity.
///
/// Bytes offered after the buffer is full are dropped and counted; stored
/// bytes are never overwritten. The length is tracked explicitly, so
/// substring search only ever sees received data.
#[derive(Debug, Clone, Default)]
pub struct ReceiveBuffer<const N: usize> {
    bytes: Vec<u8, N>,
    dropped: usize,
}

impl<const N: usize> ReceiveBuffer<N> {
    pub const fn new() -> Self {
        ReceiveBuffer {
            bytes: Vec::new(),
            dropped: 0,
        }
    }

    /// Empties the buffer and resets the overflow counter.
    pub fn clear(&mut self) {
        self.bytes.clear();
        self.dropped = 0;
    }

    /// Appends one byte. Returns `false` if it was dropped for lack of space.
    pub fn push(&mut self, byte: u8) -> bool {
        match self.bytes.push(byte) {
            Ok(()) => true,
            Err(_) => {
                self.dropped = self.dropped.saturating_add(1);
                false
            }
        }
    }

    /// Appends as much of `data` as fits; returns the number of bytes stored.
    pub fn extend_from_slice(&mut self, data: &[u8]) -> usize {
        data.iter().filter(|b| self.push(**b)).count()
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.bytes.is_full()
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Number of bytes dropped since the last `clear`.
    #[inline]
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn contains(&self, needle: &[u8]) -> bool {
        find(&self.bytes, needle).is_some()
    }

    pub fn ends_with(&self, needle: &[u8]) -> bool {
        !needle.is_empty() && self.bytes.ends_with(needle)
    }

    /// Stored bytes as text, up to the first invalid UTF-8 sequence.
    pub fn as_str_lossy(&self) -> &str {
        match core::str::from_utf8(&self.bytes) {
            Ok(s) => s,
            Err(e) => core::str::from_utf8(&self.bytes[..e.valid_up_to()]).unwrap_or(""),
        }
    }
}

/// First position of `needle` in `haystack`.
pub fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    if needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
