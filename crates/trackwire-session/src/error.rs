use std::time::Duration;

use crate::handshake::HandshakeState;

/// Errors that can occur in session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] trackwire_transport::TransportError),

    /// Input buffer error.
    #[error("frame error: {0}")]
    Frame(#[from] trackwire_frame::FrameError),

    /// The device never answered a handshake query.
    #[error("handshake failed in {state} after {attempts} attempts")]
    HandshakeFailed {
        state: HandshakeState,
        attempts: u32,
    },

    /// The handshake did not finish within the configured total timeout.
    #[error("handshake timed out after {0:?}")]
    Timeout(Duration),

    /// The session has been closed.
    #[error("session closed")]
    Closed,

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SessionError>;
