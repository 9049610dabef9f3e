use trackwire_frame::{parse_hex_digit, read_f32, read_i32};

use super::generic::{standard_decode, standard_kind, standard_length};
use super::{DialectGrammar, Length, Scan};
use crate::dialect::Dialect;
use crate::error::{Malformation, Result};
use crate::record::{Record, RecordFamily, RecordKind, StationQuality};
use crate::station::{BeaconUnit, StationTable, TrackingStatus};

const TRACKING_STATUS_LEN: usize = 48;
const TRACKING_STATUS_STATIONS: usize = 12;
const BEACON_NOMINAL_LEN: usize = 70;
const BEACON_QUIRK_OFFSET: usize = 10;

/// Longest firmware overrun of the beacon record's second field accepted.
pub const MAX_BEACON_QUIRK: usize = 16;

/// Generic tracker plus the vendor's `'3'` status records.
#[derive(Debug, Clone, Copy, Default)]
pub struct VendorExtended;

impl DialectGrammar for VendorExtended {
    fn dialect(&self) -> Dialect {
        Dialect::VendorExtended
    }

    fn record_kind(&self, buf: &[u8]) -> Scan {
        match buf.first() {
            Some(b'3') if buf.len() < 3 => Scan::NeedMoreBytes,
            Some(b'3') => Scan::Kind(vendor_kind(buf[2])),
            _ => standard_kind(buf),
        }
    }

    fn record_length(&self, kind: RecordKind, buf: &[u8], stations: &StationTable) -> Length {
        match kind {
            RecordKind::TrackingStatus => match system_one(buf) {
                Ok(()) => Length::Known(TRACKING_STATUS_LEN),
                Err(m) => Length::Malformed(m),
            },
            RecordKind::BeaconConfig => match system_one(buf) {
                Ok(()) => match quirk_bytes(buf) {
                    Ok(Some(bonus)) => Length::Known(BEACON_NOMINAL_LEN + bonus),
                    Ok(None) => Length::NeedMoreBytes,
                    Err(m) => Length::Malformed(m),
                },
                Err(m) => Length::Malformed(m),
            },
            _ => standard_length(self, kind, buf, stations),
        }
    }

    fn decode(&self, kind: RecordKind, record: &[u8], stations: &StationTable) -> Result<Record> {
        match kind {
            RecordKind::TrackingStatus => decode_tracking_status(record),
            RecordKind::BeaconConfig => decode_beacon(record),
            _ => standard_decode(self, kind, record, stations),
        }
    }
}

fn vendor_kind(subtype: u8) -> RecordKind {
    match subtype {
        b'P' => RecordKind::TrackingStatus,
        b'F' => RecordKind::BeaconConfig,
        b'S' | b's' | b'p' | b'Q' | b'G' | b'U' | b'g' => RecordKind::Passthrough {
            family: RecordFamily::Vendor,
            subtype,
        },
        other => RecordKind::Unrecognized {
            family: RecordFamily::Vendor,
            leading: b'3',
            subtype: other,
        },
    }
}

fn system_one(buf: &[u8]) -> std::result::Result<(), Malformation> {
    match buf.get(1) {
        Some(b'1') => Ok(()),
        _ => Err(Malformation::BadHeader("vendor record not from system 1")),
    }
}

/// Count the bytes some firmware inserts into the beacon record's second
/// field. The count runs to the first space at or after offset 10.
///
/// `Ok(None)` while the space has not been buffered yet.
fn quirk_bytes(buf: &[u8]) -> std::result::Result<Option<usize>, Malformation> {
    let mut bonus = 0;
    loop {
        match buf.get(BEACON_QUIRK_OFFSET + bonus) {
            None => return Ok(None),
            Some(b' ') => return Ok(Some(bonus)),
            Some(_) => {
                bonus += 1;
                if bonus > MAX_BEACON_QUIRK {
                    return Err(Malformation::QuirkTooLong(bonus));
                }
            }
        }
    }
}

fn decode_tracking_status(record: &[u8]) -> Result<Record> {
    let digit = |byte: u8| {
        parse_hex_digit(byte).ok_or(Malformation::BadHeader("tracking status count not hex"))
    };
    let stations = (0..TRACKING_STATUS_STATIONS)
        .map(|i| {
            let base = 3 + 3 * i;
            Ok(StationQuality {
                station: i as u8 + 1,
                status: TrackingStatus::from_byte(record[base]),
                measurements: digit(record[base + 1])?,
                rejects: digit(record[base + 2])?,
            })
        })
        .collect::<std::result::Result<Vec<_>, Malformation>>()?;

    Ok(Record::TrackingStatusReport {
        stations,
        update_rate: read_i32(record, 39, 4)?,
        genlock: record[45] as char,
    })
}

fn decode_beacon(record: &[u8]) -> Result<Record> {
    let bonus = quirk_bytes(record)?
        .ok_or(Malformation::BadHeader("beacon field not terminated"))?;
    let at = |offset: usize| offset + bonus;

    let beacon = BeaconUnit {
        pse_id: read_i32(record, 3, 7 + bonus)?,
        position: [
            read_f32(record, at(10), 10)?,
            read_f32(record, at(20), 10)?,
            read_f32(record, at(30), 10)?,
        ],
        normal: [
            read_f32(record, at(40), 7)?,
            read_f32(record, at(47), 7)?,
            read_f32(record, at(54), 7)?,
        ],
        hardware_id: read_i32(record, at(61), 7)?,
    };

    Ok(Record::BeaconConfig {
        beacon,
        quirk_bytes: bonus,
    })
}
