//! Dialect grammars.
//!
//! A grammar answers three questions about the front of the buffer, in
//! order: what kind of record starts here, how many bytes it spans, and what
//! it says. Each step may ask for more bytes; none of them consume anything.
//! Consumption and error accounting belong to [`RecordDecoder`].
//!
//! [`RecordDecoder`]: crate::decoder::RecordDecoder

mod alternate;
mod generic;
mod vendor;
mod wireless;

use std::fmt;

use trackwire_frame::{
    read_f32, read_i32, read_u32, station_from_char, FieldWidth, FrameError,
};

pub use alternate::AlternateVendor;
pub use generic::GenericTracker;
pub use vendor::{VendorExtended, MAX_BEACON_QUIRK};
pub use wireless::AlternateVendorWireless;

use crate::descriptor::{FieldDescriptor, FieldType, HI_RES_WIDTH};
use crate::dialect::{DeviceFamily, Dialect};
use crate::error::{DecodeError, Malformation, Result, UnsupportedReason};
use crate::record::{BannerKind, FieldValue, Record, RecordKind};
use crate::station::StationTable;

/// Every record ends with this byte; resync scans for it.
pub const TERMINATOR: u8 = b'\n';

/// Most output-list codes a single record may carry.
pub const MAX_OUTPUT_CODES: usize = 32;

/// Outcome of classifying the leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scan {
    Kind(RecordKind),
    NeedMoreBytes,
    /// The leading byte starts no record in this dialect.
    Unknown,
}

/// Outcome of sizing a classified record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Length {
    Known(usize),
    NeedMoreBytes,
    Malformed(Malformation),
    Unsupported(UnsupportedReason),
}

/// Wire grammar of one dialect.
///
/// `buf` is always the full buffered input starting at the record's first
/// byte; implementations never assume more bytes than it holds. `record`
/// passed to [`decode`](DialectGrammar::decode) is exactly the length
/// returned by [`record_length`](DialectGrammar::record_length), terminator
/// verified.
pub trait DialectGrammar: Send + Sync + fmt::Debug {
    fn dialect(&self) -> Dialect;

    fn max_stations(&self) -> u8 {
        self.dialect().max_stations()
    }

    fn family(&self) -> DeviceFamily {
        self.dialect().family()
    }

    fn field_width(&self) -> FieldWidth {
        self.family().field_width()
    }

    fn record_kind(&self, buf: &[u8]) -> Scan;

    fn record_length(&self, kind: RecordKind, buf: &[u8], stations: &StationTable) -> Length;

    fn decode(&self, kind: RecordKind, record: &[u8], stations: &StationTable) -> Result<Record>;
}

const STARTUP_BANNERS: [(&[u8], RecordKind); 2] = [
    (
        b"Patriot Wireless Ready!",
        RecordKind::StartupBanner { wireless: true },
    ),
    (
        b"Patriot Ready!",
        RecordKind::StartupBanner { wireless: false },
    ),
];

/// Rules shared by every dialect. `None` means the dialect decides.
pub(crate) fn prelude_kind(buf: &[u8]) -> Option<Scan> {
    match buf.first()? {
        b' ' | b'\r' | b'\n' => Some(Scan::Kind(RecordKind::Whitespace)),
        b'P' => Some(match_literals(buf, &STARTUP_BANNERS)),
        _ => None,
    }
}

/// Match `buf` against fixed line prefixes.
///
/// A buffer that is still a prefix of some literal needs more bytes.
pub(crate) fn match_literals(buf: &[u8], literals: &[(&[u8], RecordKind)]) -> Scan {
    let mut partial = false;
    for (literal, kind) in literals {
        if buf.starts_with(literal) {
            return Scan::Kind(*kind);
        }
        partial |= literal.starts_with(buf);
    }
    if partial {
        Scan::NeedMoreBytes
    } else {
        Scan::Unknown
    }
}

/// Length of a record framed only by its terminator.
pub(crate) fn line_length(buf: &[u8]) -> Length {
    match buf.iter().position(|&b| b == TERMINATOR) {
        Some(pos) => Length::Known(pos + 1),
        None => Length::NeedMoreBytes,
    }
}

/// Length of an output-list record.
///
/// Codes are `width` characters each starting at `start`. The list ends
/// where the byte `probe` positions into the next slot is `'\r'`, and `tail`
/// bytes of padding and line ending follow the last code.
pub(crate) fn code_list_length(
    buf: &[u8],
    start: usize,
    width: usize,
    probe: usize,
    tail: usize,
) -> Length {
    let mut pos = start;
    for _ in 0..=MAX_OUTPUT_CODES {
        match buf.get(pos + probe) {
            None => return Length::NeedMoreBytes,
            Some(b'\r') => return Length::Known(pos + tail),
            Some(_) => pos += width,
        }
    }
    Length::Malformed(Malformation::ImplausibleLength(pos + tail))
}

/// Station number of a station-id byte, if the grammar can address it.
pub(crate) fn checked_station(grammar: &dyn DialectGrammar, byte: u8) -> Option<u8> {
    station_from_char(byte).filter(|s| *s <= grammar.max_stations())
}

/// Length of a data report, from the station's installed descriptor.
pub(crate) fn data_length(
    grammar: &dyn DialectGrammar,
    station_byte: u8,
    stations: &StationTable,
) -> Length {
    let Some(station) = checked_station(grammar, station_byte) else {
        return Length::Malformed(Malformation::BadStation(station_byte));
    };
    if stations.format_flags().binary {
        return Length::Unsupported(UnsupportedReason::BinaryFormat);
    }
    // held until the output list arrives
    let Some(descriptor) = stations.descriptor(station) else {
        return Length::NeedMoreBytes;
    };
    if let Some(field) = descriptor.first_unsupported() {
        return Length::Unsupported(UnsupportedReason::Field { field });
    }
    match descriptor.record_length() {
        Some(len) => Length::Known(len),
        None => Length::NeedMoreBytes,
    }
}

fn read_triple(record: &[u8], offset: usize, width: usize) -> Result<[f32; 3]> {
    Ok([
        read_f32(record, offset, width)?,
        read_f32(record, offset + width, width)?,
        read_f32(record, offset + 2 * width, width)?,
    ])
}

fn read_buttons(record: &[u8], offset: usize, width: usize) -> Result<u32> {
    let value = read_i32(record, offset, width)?;
    u32::try_from(value).map_err(|_| {
        DecodeError::Field(FrameError::InvalidNumber {
            text: value.to_string(),
        })
    })
}

/// Decode a data report by walking the station's descriptor.
pub(crate) fn decode_data(
    grammar: &dyn DialectGrammar,
    station_byte: u8,
    record: &[u8],
    stations: &StationTable,
) -> Result<Record> {
    let station = checked_station(grammar, station_byte)
        .ok_or(Malformation::BadStation(station_byte))?;
    let descriptor = stations
        .descriptor(station)
        .ok_or(Malformation::BadHeader("no output list for station"))?;
    let family = grammar.family();
    let w = grammar.field_width().chars();

    let mut fields = Vec::with_capacity(descriptor.fields().len());
    let mut offset = FieldDescriptor::header_len(family);
    for &field in descriptor.fields() {
        let width = field
            .width(family)
            .ok_or(DecodeError::UnsupportedEncoding(UnsupportedReason::Field {
                field,
            }))?;
        let value = match field {
            FieldType::Space | FieldType::Crlf => None,
            FieldType::Position => Some(FieldValue::Position(read_triple(record, offset, w)?)),
            FieldType::PositionHiRes => Some(FieldValue::Position(read_triple(
                record,
                offset,
                HI_RES_WIDTH,
            )?)),
            FieldType::Orientation => {
                Some(FieldValue::Orientation(read_triple(record, offset, w)?))
            }
            FieldType::OrientationHiRes => Some(FieldValue::Orientation(read_triple(
                record,
                offset,
                HI_RES_WIDTH,
            )?)),
            FieldType::XAxisCosines => {
                Some(FieldValue::XAxisCosines(read_triple(record, offset, w)?))
            }
            FieldType::YAxisCosines => {
                Some(FieldValue::YAxisCosines(read_triple(record, offset, w)?))
            }
            FieldType::ZAxisCosines => {
                Some(FieldValue::ZAxisCosines(read_triple(record, offset, w)?))
            }
            FieldType::Quaternion => Some(FieldValue::Quaternion([
                read_f32(record, offset, w)?,
                read_f32(record, offset + w, w)?,
                read_f32(record, offset + 2 * w, w)?,
                read_f32(record, offset + 3 * w, w)?,
            ])),
            FieldType::Stylus | FieldType::Buttons => {
                Some(FieldValue::Buttons(read_buttons(record, offset, width)?))
            }
            FieldType::Joystick => Some(FieldValue::Joystick([
                read_i32(record, offset, 4)?,
                read_i32(record, offset + 4, 4)?,
            ])),
            FieldType::TrackingQuality => Some(FieldValue::Quality(read_i32(record, offset, 4)?)),
            FieldType::Timestamp => Some(FieldValue::Timestamp(read_u32(record, offset, 10)?)),
            FieldType::FrameCount => Some(FieldValue::FrameCount(read_u32(record, offset, 10)?)),
            FieldType::DirectionCosineMatrix | FieldType::Binary(_) | FieldType::Unknown(_) => {
                return Err(DecodeError::UnsupportedEncoding(
                    UnsupportedReason::Field { field },
                ))
            }
        };
        fields.extend(value);
        offset += width;
    }

    Ok(Record::DataReport { station, fields })
}

/// Decode an output-list record into a descriptor.
pub(crate) fn decode_output_list(
    grammar: &dyn DialectGrammar,
    station_byte: u8,
    record: &[u8],
    start: usize,
    width: usize,
    tail: usize,
) -> Result<Record> {
    let station = station_from_char(station_byte).ok_or(Malformation::BadStation(station_byte))?;
    let family = grammar.family();
    let codes = record
        .get(start..record.len().saturating_sub(tail))
        .unwrap_or_default();

    let mut fields = Vec::with_capacity(codes.len() / width);
    for chunk in codes.chunks_exact(width) {
        let code = trackwire_frame::parse_fixed_i32(chunk)?;
        let code = u8::try_from(code).map_err(|_| FrameError::InvalidNumber {
            text: code.to_string(),
        })?;
        fields.push(FieldType::from_code(code, family));
    }

    Ok(Record::OutputListDescriptor {
        station,
        descriptor: FieldDescriptor::new(fields, family),
    })
}

/// Printable text of a line record, line ending removed.
pub(crate) fn line_text(record: &[u8]) -> String {
    String::from_utf8_lossy(record).trim().to_string()
}

/// Lengths for kinds every dialect frames the same way.
pub(crate) fn common_length(kind: RecordKind, buf: &[u8]) -> Option<Length> {
    match kind {
        RecordKind::Whitespace => Some(Length::Known(1)),
        RecordKind::StartupBanner { .. }
        | RecordKind::StatusError
        | RecordKind::DeviceError
        | RecordKind::CommandEcho
        | RecordKind::Passthrough { .. } => Some(line_length(buf)),
        RecordKind::Unrecognized {
            leading, subtype, ..
        } => Some(Length::Malformed(Malformation::UnknownSubtype {
            leading: leading as char,
            subtype: subtype as char,
        })),
        _ => None,
    }
}

/// Decoding for line records every dialect interprets the same way.
pub(crate) fn common_decode(kind: RecordKind, record: &[u8]) -> Option<Record> {
    let text = line_text(record);
    match kind {
        RecordKind::StartupBanner { wireless } => Some(Record::VendorBanner {
            text,
            banner: BannerKind::Startup,
            wireless,
        }),
        RecordKind::StatusError | RecordKind::DeviceError => {
            Some(Record::ErrorReport { code: text })
        }
        RecordKind::CommandEcho => Some(Record::CommandEcho { text }),
        RecordKind::Passthrough { family, subtype } => Some(Record::Passthrough {
            family,
            subtype: subtype as char,
            text,
        }),
        _ => None,
    }
}

/// Length answer for a kind this dialect never produces.
pub(crate) fn foreign_kind(kind: RecordKind) -> Length {
    tracing::debug!(?kind, "record kind is not part of this dialect");
    Length::Malformed(Malformation::BadHeader("record kind not in dialect"))
}

pub(crate) fn foreign_decode(record: &[u8]) -> DecodeError {
    DecodeError::UnknownRecordKind(record.first().copied().unwrap_or_default())
}
