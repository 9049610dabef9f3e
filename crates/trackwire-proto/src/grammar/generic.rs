use trackwire_frame::parse_hex_digit;

use super::{
    checked_station, code_list_length, common_decode, common_length, data_length, decode_data,
    decode_output_list, foreign_decode, foreign_kind, prelude_kind, DialectGrammar, Length, Scan,
};
use crate::dialect::Dialect;
use crate::error::{Malformation, Result};
use crate::record::{FormatFlags, Record, RecordFamily, RecordKind, StationStates};
use crate::station::StationTable;

const SYSTEM_STATUS_LEN: usize = 55;
const SINGLE_STATE_LEN: usize = 9;
const ALL_STATES_LEN: usize = 37;
const ALL_STATES_COUNT: usize = 32;

/// Generic 6-DOF tracker: `'0'` data and `'2'` status records.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericTracker;

impl DialectGrammar for GenericTracker {
    fn dialect(&self) -> Dialect {
        Dialect::GenericTracker
    }

    fn record_kind(&self, buf: &[u8]) -> Scan {
        standard_kind(buf)
    }

    fn record_length(&self, kind: RecordKind, buf: &[u8], stations: &StationTable) -> Length {
        standard_length(self, kind, buf, stations)
    }

    fn decode(&self, kind: RecordKind, record: &[u8], stations: &StationTable) -> Result<Record> {
        standard_decode(self, kind, record, stations)
    }
}

pub(super) fn standard_kind(buf: &[u8]) -> Scan {
    if let Some(scan) = prelude_kind(buf) {
        return scan;
    }
    match buf.first() {
        None => Scan::NeedMoreBytes,
        Some(b'0' | b'2') if buf.len() < 3 => Scan::NeedMoreBytes,
        Some(b'0') => Scan::Kind(RecordKind::DataReport { station: buf[1] }),
        Some(b'2') => Scan::Kind(status_kind(buf[1], buf[2])),
        Some(_) => Scan::Unknown,
    }
}

fn status_kind(second: u8, subtype: u8) -> RecordKind {
    match subtype {
        b'E' if second == b' ' => RecordKind::StatusError,
        b'S' => RecordKind::SystemStatus,
        b'O' => RecordKind::OutputList { station: second },
        b'l' => RecordKind::StationState,
        b'A' | b'G' | b'H' | b'N' | b'V' => RecordKind::Passthrough {
            family: RecordFamily::Status,
            subtype,
        },
        other => RecordKind::Unrecognized {
            family: RecordFamily::Status,
            leading: b'2',
            subtype: other,
        },
    }
}

pub(super) fn standard_length(
    grammar: &dyn DialectGrammar,
    kind: RecordKind,
    buf: &[u8],
    stations: &StationTable,
) -> Length {
    if let Some(length) = common_length(kind, buf) {
        return length;
    }
    match kind {
        RecordKind::DataReport { station } => data_length(grammar, station, stations),
        RecordKind::SystemStatus => Length::Known(SYSTEM_STATUS_LEN),
        RecordKind::OutputList { station } => match checked_station(grammar, station) {
            Some(_) => code_list_length(buf, 3, 2, 0, 2),
            None => Length::Malformed(Malformation::BadStation(station)),
        },
        RecordKind::StationState => match buf.get(7) {
            None => Length::NeedMoreBytes,
            Some(b'\r') => Length::Known(SINGLE_STATE_LEN),
            Some(_) => Length::Known(ALL_STATES_LEN),
        },
        other => foreign_kind(other),
    }
}

pub(super) fn standard_decode(
    grammar: &dyn DialectGrammar,
    kind: RecordKind,
    record: &[u8],
    stations: &StationTable,
) -> Result<Record> {
    if let Some(decoded) = common_decode(kind, record) {
        return Ok(decoded);
    }
    match kind {
        RecordKind::DataReport { station } => decode_data(grammar, station, record, stations),
        RecordKind::SystemStatus => decode_system_status(record),
        RecordKind::OutputList { station } => {
            decode_output_list(grammar, station, record, 3, 2, 2)
        }
        RecordKind::StationState => decode_station_state(grammar, record),
        _ => Err(foreign_decode(record)),
    }
}

/// `21S` + format flags + firmware and system id tokens from byte 15.
fn decode_system_status(record: &[u8]) -> Result<Record> {
    let bits = record
        .get(5)
        .copied()
        .and_then(parse_hex_digit)
        .ok_or(Malformation::BadHeader("format flags are not a hex digit"))?;
    let tail = record
        .get(15..record.len().saturating_sub(2))
        .unwrap_or_default();
    let text = String::from_utf8_lossy(tail);
    let mut tokens = text.split_whitespace();
    let firmware = tokens.next().unwrap_or_default().to_string();
    let system_id = tokens.collect::<Vec<_>>().join(" ");

    Ok(Record::SystemStatus {
        firmware,
        system_id,
        format_flags: FormatFlags::from_nibble(bits),
    })
}

fn decode_station_state(grammar: &dyn DialectGrammar, record: &[u8]) -> Result<Record> {
    let states = if record.len() == SINGLE_STATE_LEN {
        let byte = record[1];
        let station = checked_station(grammar, byte).ok_or(Malformation::BadStation(byte))?;
        StationStates::Single {
            station,
            enabled: record[3] == b'1',
        }
    } else {
        let chars = record
            .get(3..3 + ALL_STATES_COUNT)
            .ok_or(Malformation::BadHeader("short station state record"))?;
        StationStates::All {
            enabled: chars.iter().map(|&b| b == b'1').collect(),
        }
    };
    Ok(Record::StationStateReport { states })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::FieldType;
    use crate::dialect::DeviceFamily;
    use crate::error::DecodeError;
    use crate::record::FieldValue;

    fn system_status(flags: u8, firmware: &str, system_id: &str) -> Vec<u8> {
        let mut rec = format!("21S{:>3}", flags as char).into_bytes();
        rec.resize(15, b' ');
        rec.extend_from_slice(format!("{firmware} {system_id}").as_bytes());
        rec.resize(53, b' ');
        rec.extend_from_slice(b"\r\n");
        rec
    }

    #[test]
    fn classifies_status_subtypes() {
        let g = GenericTracker;
        assert_eq!(g.record_kind(b"21S"), Scan::Kind(RecordKind::SystemStatus));
        assert_eq!(g.record_kind(b"2 E"), Scan::Kind(RecordKind::StatusError));
        assert_eq!(
            g.record_kind(b"21O"),
            Scan::Kind(RecordKind::OutputList { station: b'1' })
        );
        assert_eq!(
            g.record_kind(b"21V"),
            Scan::Kind(RecordKind::Passthrough {
                family: RecordFamily::Status,
                subtype: b'V'
            })
        );
        assert!(matches!(
            g.record_kind(b"21z"),
            Scan::Kind(RecordKind::Unrecognized { .. })
        ));
        assert_eq!(g.record_kind(b"2"), Scan::NeedMoreBytes);
        assert_eq!(g.record_kind(b"3"), Scan::Unknown);
    }

    #[test]
    fn decodes_system_status() {
        let rec = system_status(b'9', "3.0", "IS900-PCTracker");
        assert_eq!(rec.len(), SYSTEM_STATUS_LEN);
        let table = StationTable::new();
        let g = GenericTracker;
        assert_eq!(
            g.record_length(RecordKind::SystemStatus, &rec, &table),
            Length::Known(55)
        );
        match g.decode(RecordKind::SystemStatus, &rec, &table).unwrap() {
            Record::SystemStatus {
                firmware,
                system_id,
                format_flags,
            } => {
                assert_eq!(firmware, "3.0");
                assert_eq!(system_id, "IS900-PCTracker");
                assert!(format_flags.binary);
                assert!(format_flags.continuous);
                assert!(!format_flags.centimeters);
            }
            other => panic!("unexpected record {other:?}"),
        }
    }

    #[test]
    fn system_status_rejects_non_hex_flags() {
        let rec = system_status(b'x', "3.0", "fastrak");
        let err = GenericTracker
            .decode(RecordKind::SystemStatus, &rec, &StationTable::new())
            .unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(Malformation::BadHeader(_))));
    }

    #[test]
    fn decodes_output_list() {
        let rec = b"21O 2 4 1\r\n";
        let table = StationTable::new();
        let kind = RecordKind::OutputList { station: b'1' };
        assert_eq!(
            GenericTracker.record_length(kind, rec, &table),
            Length::Known(rec.len())
        );
        match GenericTracker.decode(kind, rec, &table).unwrap() {
            Record::OutputListDescriptor {
                station,
                descriptor,
            } => {
                assert_eq!(station, 1);
                assert_eq!(descriptor.family(), DeviceFamily::Standard);
                assert_eq!(
                    descriptor.fields(),
                    &[FieldType::Position, FieldType::Orientation, FieldType::Crlf]
                );
                assert_eq!(descriptor.record_length(), Some(47));
            }
            other => panic!("unexpected record {other:?}"),
        }
    }

    #[test]
    fn output_list_for_unaddressable_station_is_malformed() {
        let kind = RecordKind::OutputList { station: b'Z' };
        assert_eq!(
            GenericTracker.record_length(kind, b"2ZO 2\r\n", &StationTable::new()),
            Length::Malformed(Malformation::BadStation(b'Z'))
        );
    }

    #[test]
    fn station_state_single_and_all() {
        let table = StationTable::new();
        let single = b"21l1000\r\n";
        assert_eq!(
            GenericTracker.record_length(RecordKind::StationState, single, &table),
            Length::Known(9)
        );
        assert_eq!(
            GenericTracker
                .decode(RecordKind::StationState, single, &table)
                .unwrap(),
            Record::StationStateReport {
                states: StationStates::Single {
                    station: 1,
                    enabled: true
                }
            }
        );

        let mut all = b"21l1100".to_vec();
        all.extend_from_slice(&[b'0'; 28]);
        all.extend_from_slice(b"\r\n");
        assert_eq!(
            GenericTracker.record_length(RecordKind::StationState, &all, &table),
            Length::Known(37)
        );
        match GenericTracker
            .decode(RecordKind::StationState, &all, &table)
            .unwrap()
        {
            Record::StationStateReport {
                states: StationStates::All { enabled },
            } => {
                assert_eq!(enabled.len(), 32);
                assert_eq!(&enabled[..4], &[true, true, false, false]);
            }
            other => panic!("unexpected record {other:?}"),
        }
    }

    #[test]
    fn data_report_needs_descriptor() {
        let table = StationTable::new();
        let kind = RecordKind::DataReport { station: b'1' };
        assert_eq!(
            GenericTracker.record_length(kind, b"01 ", &table),
            Length::NeedMoreBytes
        );
    }

    #[test]
    fn decodes_buttons_and_joystick() {
        let mut table = StationTable::new();
        table
            .apply(&Record::OutputListDescriptor {
                station: 2,
                descriptor: crate::descriptor::FieldDescriptor::new(
                    vec![
                        FieldType::TrackingQuality,
                        FieldType::Buttons,
                        FieldType::Joystick,
                        FieldType::Crlf,
                    ],
                    DeviceFamily::Standard,
                ),
            })
            .unwrap();
        let rec = b"02  120   3  127 -12\r\n";
        let kind = RecordKind::DataReport { station: b'2' };
        assert_eq!(
            GenericTracker.record_length(kind, rec, &table),
            Length::Known(rec.len())
        );
        match GenericTracker.decode(kind, rec, &table).unwrap() {
            Record::DataReport { station, fields } => {
                assert_eq!(station, 2);
                assert_eq!(
                    fields,
                    vec![
                        FieldValue::Quality(120),
                        FieldValue::Buttons(3),
                        FieldValue::Joystick([127, -12]),
                    ]
                );
            }
            other => panic!("unexpected record {other:?}"),
        }
    }
}
