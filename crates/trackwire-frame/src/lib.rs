//! Byte accumulation and field parsing for tracker streams.
//!
//! Tracker records are not length-prefixed, and a single non-blocking read
//! rarely lines up with record boundaries. This crate provides:
//! - [`FrameAccumulator`]: a bounded buffer that keeps undecoded bytes
//!   between reads and retires them only on explicit `consume`
//! - [`fields`]: fixed-width ASCII numeric fields (7 or 9 characters) and
//!   station-id characters
//!
//! Overflowing the buffer is an explicit, recoverable error.

pub mod accumulator;
pub mod error;
pub mod fields;

pub use accumulator::{FrameAccumulator, FrameConfig, DEFAULT_CAPACITY};
pub use error::{FrameError, Result};
pub use fields::{
    parse_fixed_f32, parse_fixed_i32, parse_fixed_u32, parse_hex_digit, read_f32, read_i32,
    read_u32, slice_field, station_from_char, station_to_char, FieldWidth,
};
