use bytes::{Buf, BytesMut};
use tracing::warn;

use crate::error::{FrameError, Result};

/// Default buffer capacity in bytes.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Configuration for the frame accumulator.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum number of undecoded bytes held at once. Default: 1 KiB.
    pub capacity: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

/// Holds the bytes read from a device that have not been decoded yet.
///
/// Bytes are appended by [`ingest`](Self::ingest) and retired strictly from
/// the front by [`consume`](Self::consume). Nothing else mutates the buffered
/// region, so a record that spans several reads is resumed intact.
#[derive(Debug)]
pub struct FrameAccumulator {
    buf: BytesMut,
    config: FrameConfig,
    overflows: u64,
}

impl FrameAccumulator {
    /// Create an accumulator with default configuration.
    pub fn new() -> Self {
        Self::with_config(FrameConfig::default())
    }

    /// Create an accumulator with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            buf: BytesMut::with_capacity(config.capacity),
            config,
            overflows: 0,
        }
    }

    /// Create an accumulator holding at most `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_config(FrameConfig { capacity })
    }

    /// Append freshly read bytes.
    ///
    /// If the result would exceed the capacity, everything buffered is
    /// discarded along with `bytes` and `BufferOverflow` is returned. The
    /// accumulator is immediately usable again.
    pub fn ingest(&mut self, bytes: &[u8]) -> Result<()> {
        let buffered = self.buf.len();
        if buffered + bytes.len() > self.config.capacity {
            self.buf.clear();
            self.overflows += 1;
            warn!(
                buffered,
                incoming = bytes.len(),
                capacity = self.config.capacity,
                "accumulator overflow, buffer cleared"
            );
            return Err(FrameError::BufferOverflow {
                buffered,
                incoming: bytes.len(),
                capacity: self.config.capacity,
            });
        }
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    /// All buffered bytes, oldest first.
    pub fn buffered(&self) -> &[u8] {
        &self.buf
    }

    /// The first `n` buffered bytes, or `None` if fewer are available.
    pub fn peek(&self, n: usize) -> Option<&[u8]> {
        self.buf.get(..n)
    }

    /// Retire up to `n` bytes from the front. Returns how many were retired.
    pub fn consume(&mut self, n: usize) -> usize {
        let n = n.min(self.buf.len());
        self.buf.advance(n);
        n
    }

    /// Discard everything buffered.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Number of overflows since creation.
    pub fn overflows(&self) -> u64 {
        self.overflows
    }

    /// Current accumulator configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl Default for FrameAccumulator {
    fn default() -> Self {
        Self::new()
    }
}
