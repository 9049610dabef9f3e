use std::collections::VecDeque;

use tracing::trace;

use crate::error::{Result, TransportError};
use crate::traits::Transport;

/// A canned reply queued whenever a matching command is written.
#[derive(Debug, Clone)]
struct Responder {
    command: Vec<u8>,
    reply: Vec<u8>,
    /// Matching writes to ignore before replying.
    skip: usize,
    /// Remaining replies; `None` answers forever.
    remaining: Option<usize>,
}

/// Scripted in-memory device.
///
/// Inbound bytes are queued as chunks; each read returns at most one chunk
/// (split further when `max_len` is smaller), which mimics how a serial line
/// delivers whatever the UART has collected so far. Everything written is
/// recorded, and responders can answer specific commands.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    inbound: VecDeque<Vec<u8>>,
    written: Vec<u8>,
    responders: Vec<Responder>,
    closed: bool,
}

impl MemoryTransport {
    /// Create an empty device.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a device that will deliver `chunks` in order.
    pub fn with_chunks<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Vec<u8>>,
    {
        let mut transport = Self::new();
        for chunk in chunks {
            transport.push_inbound(chunk);
        }
        transport
    }

    /// Queue bytes for a later read. Empty chunks are kept and read back as
    /// an empty poll.
    pub fn push_inbound(&mut self, bytes: impl Into<Vec<u8>>) {
        self.inbound.push_back(bytes.into());
    }

    /// Reply with `reply` every time exactly `command` is written.
    pub fn respond_to(&mut self, command: impl Into<Vec<u8>>, reply: impl Into<Vec<u8>>) -> &mut Self {
        self.responders.push(Responder {
            command: command.into(),
            reply: reply.into(),
            skip: 0,
            remaining: None,
        });
        self
    }

    /// Ignore the first `skip` writes of `command`, then reply once.
    pub fn respond_after(
        &mut self,
        command: impl Into<Vec<u8>>,
        skip: usize,
        reply: impl Into<Vec<u8>>,
    ) -> &mut Self {
        self.responders.push(Responder {
            command: command.into(),
            reply: reply.into(),
            skip,
            remaining: Some(1),
        });
        self
    }

    /// Everything written so far.
    pub fn written(&self) -> &[u8] {
        &self.written
    }

    /// Take and clear the written bytes.
    pub fn take_written(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.written)
    }

    /// Number of queued inbound chunks.
    pub fn pending_inbound(&self) -> usize {
        self.inbound.len()
    }

    fn answer(&mut self, command: &[u8]) {
        for responder in &mut self.responders {
            if responder.command != command {
                continue;
            }
            if responder.skip > 0 {
                responder.skip -= 1;
                continue;
            }
            match responder.remaining {
                Some(0) => continue,
                Some(ref mut n) => *n -= 1,
                None => {}
            }
            trace!(bytes = responder.reply.len(), "queueing scripted reply");
            self.inbound.push_back(responder.reply.clone());
        }
    }
}

impl Transport for MemoryTransport {
    fn read_nonblocking(&mut self, max_len: usize) -> Result<Vec<u8>> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        let Some(mut chunk) = self.inbound.pop_front() else {
            return Ok(Vec::new());
        };
        if chunk.len() > max_len {
            let rest = chunk.split_off(max_len);
            self.inbound.push_front(rest);
        }
        Ok(chunk)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.written.extend_from_slice(bytes);
        self.answer(bytes);
        Ok(bytes.len())
    }

    fn flush_input(&mut self) -> Result<()> {
        self.inbound.clear();
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_chunks_in_order() {
        let mut t = MemoryTransport::with_chunks([b"01".to_vec(), b"23".to_vec()]);
        assert_eq!(t.read_nonblocking(64).unwrap(), b"01");
        assert_eq!(t.read_nonblocking(64).unwrap(), b"23");
        assert!(t.read_nonblocking(64).unwrap().is_empty());
    }

    #[test]
    fn splits_chunk_larger_than_request() {
        let mut t = MemoryTransport::with_chunks([b"abcdef".to_vec()]);
        assert_eq!(t.read_nonblocking(4).unwrap(), b"abcd");
        assert_eq!(t.read_nonblocking(4).unwrap(), b"ef");
    }

    #[test]
    fn responder_answers_matching_command() {
        let mut t = MemoryTransport::new();
        t.respond_to("S", "2S reply\r\n");
        t.write_all(b"P").unwrap();
        assert_eq!(t.pending_inbound(), 0);
        t.write_all(b"S").unwrap();
        assert_eq!(t.read_nonblocking(64).unwrap(), b"2S reply\r\n");
        assert_eq!(t.written(), b"PS");
    }

    #[test]
    fn delayed_responder_replies_once() {
        let mut t = MemoryTransport::new();
        t.respond_after("S", 2, "ok\r\n");
        for _ in 0..2 {
            t.write_all(b"S").unwrap();
            assert_eq!(t.pending_inbound(), 0);
        }
        t.write_all(b"S").unwrap();
        assert_eq!(t.pending_inbound(), 1);
        t.write_all(b"S").unwrap();
        assert_eq!(t.pending_inbound(), 1);
    }

    #[test]
    fn closed_transport_rejects_io() {
        let mut t = MemoryTransport::new();
        t.close().unwrap();
        assert!(matches!(t.read_nonblocking(8), Err(TransportError::Closed)));
        assert!(matches!(t.write(b"P"), Err(TransportError::Closed)));
    }

    #[test]
    fn flush_input_discards_pending() {
        let mut t = MemoryTransport::with_chunks([b"stale".to_vec()]);
        t.flush_input().unwrap();
        assert!(t.read_nonblocking(8).unwrap().is_empty());
    }
}
