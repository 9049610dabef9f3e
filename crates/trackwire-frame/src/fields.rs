//! Fixed-width ASCII fields.
//!
//! Numeric payload fields are right-aligned decimal text padded with spaces,
//! for example `"  12.00"` (7 characters) or `"  12.3456"` (9 characters).

use crate::error::{FrameError, Result};

/// Width of one numeric field, which depends on the device dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldWidth {
    /// 7-character fields.
    Generic,
    /// 9-character fields.
    Alternate,
}

impl FieldWidth {
    pub const fn chars(self) -> usize {
        match self {
            FieldWidth::Generic => 7,
            FieldWidth::Alternate => 9,
        }
    }
}

/// Borrow `width` bytes of `record` starting at `offset`.
pub fn slice_field(record: &[u8], offset: usize, width: usize) -> Result<&[u8]> {
    record
        .get(offset..offset + width)
        .ok_or(FrameError::FieldOutOfBounds {
            offset,
            width,
            len: record.len(),
        })
}

fn trimmed(text: &[u8]) -> Result<&str> {
    std::str::from_utf8(text.trim_ascii())
        .ok()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| invalid(text))
}

fn invalid(text: &[u8]) -> FrameError {
    FrameError::InvalidNumber {
        text: String::from_utf8_lossy(text).into_owned(),
    }
}

/// Parse a space-padded decimal number. Non-finite values are rejected.
pub fn parse_fixed_f32(text: &[u8]) -> Result<f32> {
    let value: f32 = trimmed(text)?.parse().map_err(|_| invalid(text))?;
    if !value.is_finite() {
        return Err(invalid(text));
    }
    Ok(value)
}

/// Parse a space-padded decimal integer.
pub fn parse_fixed_i32(text: &[u8]) -> Result<i32> {
    trimmed(text)?.parse().map_err(|_| invalid(text))
}

/// Parse a space-padded unsigned counter such as a timestamp.
pub fn parse_fixed_u32(text: &[u8]) -> Result<u32> {
    trimmed(text)?.parse().map_err(|_| invalid(text))
}

/// Read a float field of `width` bytes at `offset`.
pub fn read_f32(record: &[u8], offset: usize, width: usize) -> Result<f32> {
    parse_fixed_f32(slice_field(record, offset, width)?)
}

/// Read an integer field of `width` bytes at `offset`.
pub fn read_i32(record: &[u8], offset: usize, width: usize) -> Result<i32> {
    parse_fixed_i32(slice_field(record, offset, width)?)
}

/// Read an unsigned field of `width` bytes at `offset`.
pub fn read_u32(record: &[u8], offset: usize, width: usize) -> Result<u32> {
    parse_fixed_u32(slice_field(record, offset, width)?)
}

/// Value of a single hex digit (either case).
pub fn parse_hex_digit(byte: u8) -> Option<u8> {
    (byte as char).to_digit(16).map(|d| d as u8)
}

/// Station number encoded by a station-id character.
///
/// `'1'..='9'` map to 1..=9 and letters continue from 10, so `'A'` and `'a'`
/// are both station 10.
pub fn station_from_char(byte: u8) -> Option<u8> {
    match byte {
        b'1'..=b'9' => Some(byte - b'0'),
        b'A'..=b'Z' => Some(byte - b'A' + 10),
        b'a'..=b'z' => Some(byte - b'a' + 10),
        _ => None,
    }
}

/// Station-id character used when addressing station `n` in a command.
pub fn station_to_char(n: u8) -> Option<u8> {
    match n {
        1..=9 => Some(b'0' + n),
        10..=35 => Some(b'A' + n - 10),
        _ => None,
    }
}
