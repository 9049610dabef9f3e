use std::path::PathBuf;

/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the device at the specified path.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An I/O error occurred on the open device.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The device stopped accepting output before a command was fully written.
    #[error("write stalled after {written} of {total} bytes")]
    Stalled { written: usize, total: usize },

    /// The transport has been closed.
    #[error("transport closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, TransportError>;
