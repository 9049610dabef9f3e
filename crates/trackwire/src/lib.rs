//! Streaming decoder for serial-connected 6-DOF trackers.
//!
//! trackwire turns the byte stream of a generic, vendor-extended or
//! alternate-vendor (wired or wireless) tracker into typed records and
//! per-station pose state, without ever blocking on the device.
//!
//! # Crate Structure
//!
//! - [`transport`]: non-blocking byte transports (serial line, in-memory)
//! - [`frame`]: bounded input buffer and fixed-width field parsing
//! - [`proto`]: dialect grammars, record decoding, station table, commands
//! - [`session`]: handshake state machine and the session aggregate (behind
//!   the `session` feature)
//!
//! ```
//! use trackwire::frame::FrameAccumulator;
//! use trackwire::proto::{Dialect, RecordDecoder, StationTable};
//!
//! let mut acc = FrameAccumulator::new();
//! let mut stations = StationTable::new();
//! acc.ingest(b"01O   2  4  1 \r\n")?;
//!
//! let records = RecordDecoder::new().drain(
//!     &mut acc,
//!     Dialect::AlternateVendor.grammar(),
//!     &mut stations,
//! );
//! assert_eq!(records.len(), 1);
//! assert!(stations.descriptor(1).is_some());
//! # Ok::<(), trackwire::frame::FrameError>(())
//! ```

/// Re-export transport types.
pub mod transport {
    pub use trackwire_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use trackwire_frame::*;
}

/// Re-export protocol types.
pub mod proto {
    pub use trackwire_proto::*;
}

/// Re-export session types (requires `session` feature).
#[cfg(feature = "session")]
pub mod session {
    pub use trackwire_session::*;
}
