use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::Transport;

/// A tty device opened for non-blocking reads and writes.
///
/// The line is opened with `O_NONBLOCK | O_NOCTTY` so that it never becomes
/// the controlling terminal and never stalls the poll loop. Baud rate and
/// line discipline are whatever the host configured beforehand.
#[derive(Debug)]
pub struct SerialLine {
    file: Option<File>,
    path: PathBuf,
}

impl SerialLine {
    /// Open the device at `path` for reading and writing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NONBLOCK | libc::O_NOCTTY)
            .open(&path)
            .map_err(|source| TransportError::Open {
                path: path.clone(),
                source,
            })?;

        info!(?path, "opened serial line");
        Ok(Self {
            file: Some(file),
            path,
        })
    }

    /// Path the line was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file(&mut self) -> Result<&mut File> {
        self.file.as_mut().ok_or(TransportError::Closed)
    }
}

impl Transport for SerialLine {
    fn read_nonblocking(&mut self, max_len: usize) -> Result<Vec<u8>> {
        let file = self.file()?;
        let mut buf = vec![0u8; max_len];
        loop {
            match file.read(&mut buf) {
                Ok(n) => {
                    buf.truncate(n);
                    return Ok(buf);
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => return Ok(Vec::new()),
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        let file = self.file()?;
        loop {
            match file.write(bytes) {
                Ok(n) => return Ok(n),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => return Ok(0),
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn flush_input(&mut self) -> Result<()> {
        let fd = self.file()?.as_raw_fd();
        // SAFETY: `fd` belongs to a file owned by this struct and stays open
        // for the duration of the call.
        let rc = unsafe { libc::tcflush(fd, libc::TCIFLUSH) };
        if rc != 0 {
            return Err(TransportError::Io(std::io::Error::last_os_error()));
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.file.take().is_some() {
            debug!(path = ?self.path, "closed serial line");
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.file.is_none()
    }
}
