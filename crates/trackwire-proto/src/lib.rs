//! Wire protocol for serial 6-DOF trackers.
//!
//! Four dialects share one leading-byte grammar: a record's first byte (and
//! for most kinds its third) says what it is, its length follows from fixed
//! layouts or from the station's output list, and every record ends in
//! `'\n'`. This crate provides:
//! - [`DialectGrammar`] and one implementation per [`Dialect`]
//! - [`RecordDecoder`]: resumable extraction with counted, never fatal,
//!   recovery from malformed input
//! - [`StationTable`]: per-station state, the single place records mutate
//! - [`Command`]: host commands for both device families
//!
//! ```
//! use trackwire_frame::FrameAccumulator;
//! use trackwire_proto::{Dialect, RecordDecoder, StationTable};
//!
//! let mut acc = FrameAccumulator::new();
//! let mut table = StationTable::new();
//! let mut decoder = RecordDecoder::new();
//!
//! acc.ingest(b"21O 2 4 1\r\n01   12.00  -3.50   0.25  10.00   0.00  -5.00\r\n")?;
//! let records = decoder.drain(&mut acc, Dialect::GenericTracker.grammar(), &mut table);
//!
//! assert_eq!(records.len(), 2);
//! assert_eq!(table.station(1).unwrap().position, [12.0, -3.5, 0.25]);
//! # Ok::<(), trackwire_frame::FrameError>(())
//! ```

pub mod command;
pub mod decoder;
pub mod descriptor;
pub mod dialect;
pub mod error;
pub mod grammar;
pub mod record;
pub mod resync;
pub mod station;

pub use command::{Command, Hemisphere};
pub use decoder::{DecodeStats, RecordDecoder};
pub use descriptor::{FieldDescriptor, FieldType};
pub use dialect::{DeviceFamily, Dialect};
pub use error::{DecodeError, Malformation, Result, UnsupportedReason};
pub use grammar::{DialectGrammar, Length, Scan, TERMINATOR};
pub use record::{
    BannerKind, FieldValue, FormatFlags, Record, RecordFamily, RecordKind, Setting,
    StationQuality, StationStates,
};
pub use resync::ResyncPolicy;
pub use station::{
    BeaconUnit, ChangeFlags, StationTable, StationUnit, TrackingStatus, DEFAULT_MAX_BEACONS,
    DEFAULT_MAX_STATIONS,
};
