//! Non-blocking byte transports for tracker sessions.
//!
//! A transport is the lowest layer of trackwire: it moves raw bytes to and
//! from a device and never blocks. Two implementations are provided:
//! - [`SerialLine`]: a tty device opened non-blocking (Unix)
//! - [`MemoryTransport`]: a scripted in-memory device for tests and replays
//!
//! Line settings (baud rate, parity, raw mode) are left to the host.

pub mod error;
pub mod memory;
pub mod traits;

#[cfg(unix)]
pub mod serial;

pub use error::{Result, TransportError};
pub use memory::MemoryTransport;
pub use traits::{Transport, DEFAULT_READ_CHUNK};

#[cfg(unix)]
pub use serial::SerialLine;
