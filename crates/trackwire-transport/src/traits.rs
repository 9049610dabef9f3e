use crate::error::{Result, TransportError};

/// Default number of bytes requested per non-blocking read.
pub const DEFAULT_READ_CHUNK: usize = 1024;

/// Consecutive zero-length writes tolerated by [`Transport::write_all`].
const MAX_STALLED_WRITES: usize = 64;

/// A non-blocking byte source and sink owned by exactly one session.
///
/// Neither direction may block. A read with nothing available returns an
/// empty vector; a write that cannot make progress returns `Ok(0)`.
pub trait Transport {
    /// Read up to `max_len` bytes that are available right now.
    fn read_nonblocking(&mut self, max_len: usize) -> Result<Vec<u8>>;

    /// Write as much of `bytes` as the device accepts right now.
    fn write(&mut self, bytes: &[u8]) -> Result<usize>;

    /// Discard input the device has sent but nobody has read yet.
    fn flush_input(&mut self) -> Result<()> {
        Ok(())
    }

    /// Release the underlying device. Further reads and writes fail with
    /// [`TransportError::Closed`].
    fn close(&mut self) -> Result<()>;

    /// Whether [`Transport::close`] has been called.
    fn is_closed(&self) -> bool;

    /// Write a complete command, retrying short writes.
    ///
    /// Gives up with [`TransportError::Stalled`] when the device keeps
    /// refusing output.
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let mut written = 0usize;
        let mut stalled = 0usize;
        while written < bytes.len() {
            match self.write(&bytes[written..])? {
                0 => {
                    stalled += 1;
                    if stalled >= MAX_STALLED_WRITES {
                        return Err(TransportError::Stalled {
                            written,
                            total: bytes.len(),
                        });
                    }
                }
                n => {
                    written += n;
                    stalled = 0;
                }
            }
        }
        Ok(())
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn read_nonblocking(&mut self, max_len: usize) -> Result<Vec<u8>> {
        (**self).read_nonblocking(max_len)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        (**self).write(bytes)
    }

    fn flush_input(&mut self) -> Result<()> {
        (**self).flush_input()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn is_closed(&self) -> bool {
        (**self).is_closed()
    }
}
