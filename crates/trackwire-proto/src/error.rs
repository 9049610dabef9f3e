use crate::descriptor::FieldType;

/// Why a record could not be framed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Malformation {
    /// The byte at the end of the computed length is not the terminator.
    #[error("expected terminator at byte {offset}, found 0x{found:02x}")]
    MissingTerminator { offset: usize, found: u8 },

    /// The computed length is zero or larger than the buffer can ever hold.
    #[error("implausible record length {0}")]
    ImplausibleLength(usize),

    /// The station-id byte names no station the dialect can address.
    #[error("bad station id byte 0x{0:02x}")]
    BadStation(u8),

    /// The leading byte is known but the subtype byte is not.
    #[error("unknown subtype {subtype:?} for record '{leading}'")]
    UnknownSubtype { leading: char, subtype: char },

    /// A fixed header byte has the wrong value.
    #[error("bad record header: {0}")]
    BadHeader(&'static str),

    /// The beacon record's firmware overrun is longer than any observed.
    #[error("beacon field overrun of {0} bytes exceeds limit")]
    QuirkTooLong(usize),
}

/// Why a record was recognized but cannot be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum UnsupportedReason {
    /// The device reports binary output format.
    BinaryFormat,
    /// The station's output list contains a field with no ASCII layout.
    Field { field: FieldType },
}

/// Errors raised while decoding a record or applying it to station state.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The leading byte is not recognized by the active dialect.
    #[error("unknown record kind 0x{0:02x}")]
    UnknownRecordKind(u8),

    /// The record failed framing or header checks.
    #[error("malformed record: {0}")]
    Malformed(#[from] Malformation),

    /// The record uses an encoding this decoder does not implement.
    #[error("unsupported encoding: {0:?}")]
    UnsupportedEncoding(UnsupportedReason),

    /// The record names a station outside the table.
    #[error("station {station} out of range (max {max})")]
    StationOutOfRange { station: u8, max: u8 },

    /// A new beacon arrived while the beacon table was full.
    #[error("beacon table full ({capacity} entries)")]
    BeaconTableFull { capacity: usize },

    /// A numeric field failed to parse.
    #[error("field error: {0}")]
    Field(#[from] trackwire_frame::FrameError),
}

pub type Result<T> = std::result::Result<T, DecodeError>;
