//! Connection handshake and polling session for serial 6-DOF trackers.
//!
//! A [`Session`] owns one [`Transport`](trackwire_transport::Transport) and
//! everything decoded from it. [`Session::connect`] identifies the device,
//! discovers its stations and installs their output lists; after that,
//! [`Session::poll_cycle`] polls and decodes without ever blocking.
//!
//! ```
//! use trackwire_proto::Dialect;
//! use trackwire_session::{Session, SessionConfig};
//! use trackwire_transport::MemoryTransport;
//!
//! let mut device = MemoryTransport::new();
//! device.respond_to("P", "01   12.00  -3.50   0.25  10.00   0.00  -5.00\r\n");
//!
//! let mut session = Session::established(device, SessionConfig::default(), Dialect::GenericTracker)?;
//! session.ingest(b"21O 2 4 1\r\n")?;
//! session.poll_records().for_each(drop);
//!
//! let records = session.poll_cycle()?;
//! assert_eq!(records.len(), 1);
//! assert!(session.take_changes().receiver_changed);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod error;
pub mod handshake;
pub mod session;

pub use config::{HandshakeConfig, SessionConfig};
pub use error::{Result, SessionError};
pub use handshake::{HandshakeSession, HandshakeState};
pub use session::Session;
