use trackwire_frame::parse_fixed_f32;

use super::{
    code_list_length, common_decode, common_length, data_length, decode_data, decode_output_list,
    foreign_decode, foreign_kind, line_text, match_literals, prelude_kind, DialectGrammar, Length,
    Scan,
};
use crate::dialect::Dialect;
use crate::error::{Malformation, Result};
use crate::record::{BannerKind, Record, RecordFamily, RecordKind, Setting, StationStates};
use crate::station::StationTable;

const SETTING_ECHO_LEN: usize = 8;
const VERSION_LEN: usize = 128;
const WIRELESS_VERSION_LEN: usize = 137;
const SIGNAL_STRENGTH_LEN: usize = 149;
/// Output-list records address up to four units on either model.
const OUTPUT_LIST_STATIONS: u8 = 4;

const DEVICE_LINES: [(&[u8], RecordKind); 6] = [
    (b"Invalid Command!", RecordKind::DeviceError),
    (b"Invalid Parameter!", RecordKind::DeviceError),
    (b"Echo Off", RecordKind::CommandEcho),
    (b"@A1", RecordKind::CommandEcho),
    (b"F0", RecordKind::CommandEcho),
    (b"U0", RecordKind::CommandEcho),
];

/// Alternate vendor, wired model: control-character commands, 9-character
/// fields, and every response led by `'0'`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlternateVendor;

impl DialectGrammar for AlternateVendor {
    fn dialect(&self) -> Dialect {
        Dialect::AlternateVendor
    }

    fn record_kind(&self, buf: &[u8]) -> Scan {
        alternate_kind(buf, false)
    }

    fn record_length(&self, kind: RecordKind, buf: &[u8], stations: &StationTable) -> Length {
        alternate_length(self, kind, buf, stations, false)
    }

    fn decode(&self, kind: RecordKind, record: &[u8], stations: &StationTable) -> Result<Record> {
        alternate_decode(self, kind, record, stations, false)
    }
}

pub(super) fn alternate_kind(buf: &[u8], wireless: bool) -> Scan {
    if let Some(scan) = prelude_kind(buf) {
        return scan;
    }
    match buf.first() {
        None => Scan::NeedMoreBytes,
        Some(b'0') if buf.len() < 3 => Scan::NeedMoreBytes,
        Some(b'0') => match buf[2] {
            b' ' => Scan::Kind(RecordKind::DataReport { station: buf[1] }),
            b'F' => Scan::Kind(RecordKind::SettingEcho(Setting::Format)),
            b'U' => Scan::Kind(RecordKind::SettingEcho(Setting::Units)),
            b'v' => Scan::Kind(RecordKind::VersionBanner),
            b'u' => Scan::Kind(RecordKind::UnitStates),
            b'O' => Scan::Kind(RecordKind::OutputList { station: buf[1] }),
            b'@' if wireless => match buf.get(3) {
                None => Scan::NeedMoreBytes,
                Some(b'S') => Scan::Kind(RecordKind::SignalStrength),
                Some(&other) => Scan::Kind(RecordKind::Unrecognized {
                    family: RecordFamily::Device,
                    leading: b'@',
                    subtype: other,
                }),
            },
            other => Scan::Kind(RecordKind::Unrecognized {
                family: RecordFamily::Device,
                leading: b'0',
                subtype: other,
            }),
        },
        Some(_) => match_literals(buf, &DEVICE_LINES),
    }
}

pub(super) fn alternate_length(
    grammar: &dyn DialectGrammar,
    kind: RecordKind,
    buf: &[u8],
    stations: &StationTable,
    wireless: bool,
) -> Length {
    if let Some(length) = common_length(kind, buf) {
        return length;
    }
    match kind {
        RecordKind::DataReport { station } => data_length(grammar, station, stations),
        RecordKind::SettingEcho(_) => Length::Known(SETTING_ECHO_LEN),
        RecordKind::VersionBanner => match buf.get(24..32) {
            None => Length::NeedMoreBytes,
            Some(b"Wireless") => Length::Known(WIRELESS_VERSION_LEN),
            Some(_) => Length::Known(VERSION_LEN),
        },
        RecordKind::UnitStates => Length::Known(unit_states_len(wireless)),
        RecordKind::OutputList { station } => {
            match trackwire_frame::station_from_char(station) {
                Some(1..=OUTPUT_LIST_STATIONS) => code_list_length(buf, 4, 3, 1, 3),
                _ => Length::Malformed(Malformation::BadStation(station)),
            }
        }
        RecordKind::SignalStrength if wireless => Length::Known(SIGNAL_STRENGTH_LEN),
        other => foreign_kind(other),
    }
}

pub(super) fn alternate_decode(
    grammar: &dyn DialectGrammar,
    kind: RecordKind,
    record: &[u8],
    stations: &StationTable,
    wireless: bool,
) -> Result<Record> {
    if let Some(decoded) = common_decode(kind, record) {
        return Ok(decoded);
    }
    match kind {
        RecordKind::DataReport { station } => decode_data(grammar, station, record, stations),
        RecordKind::SettingEcho(setting) => Ok(Record::SettingEcho {
            setting,
            value: setting_value(record),
        }),
        RecordKind::VersionBanner => Ok(Record::VendorBanner {
            text: line_text(record.get(3..).unwrap_or_default()),
            banner: BannerKind::Version,
            wireless: record.get(24..32) == Some(b"Wireless".as_slice()),
        }),
        RecordKind::UnitStates => Ok(decode_unit_states(record, wireless)),
        RecordKind::OutputList { station } => {
            decode_output_list(grammar, station, record, 4, 3, 3)
        }
        RecordKind::SignalStrength if wireless => decode_signal_strength(record),
        _ => Err(foreign_decode(record)),
    }
}

fn unit_states_len(wireless: bool) -> usize {
    if wireless {
        11
    } else {
        9
    }
}

/// Last digit before the line ending, e.g. `0` in `"01F  0\r\n"`.
fn setting_value(record: &[u8]) -> Option<u8> {
    record
        .get(3..record.len().saturating_sub(2))?
        .iter()
        .rev()
        .find(|b| b.is_ascii_digit())
        .map(|b| b - b'0')
}

/// Unit states are a bit string written most significant unit first, so
/// unit 1 is the last character before the line ending.
fn decode_unit_states(record: &[u8], wireless: bool) -> Record {
    let (units, last) = if wireless { (4, 8) } else { (2, 6) };
    let enabled = (0..units)
        .map(|i| record.get(last - i) == Some(&b'1'))
        .collect();
    Record::StationStateReport {
        states: StationStates::All { enabled },
    }
}

fn decode_signal_strength(record: &[u8]) -> Result<Record> {
    let body = record.get(4..).unwrap_or_default();
    let mut values = body
        .split(|b| b.is_ascii_whitespace())
        .filter(|token| !token.is_empty())
        .map(parse_fixed_f32);

    let mut signals = [0.0f32; 4];
    for signal in &mut signals {
        *signal = values
            .next()
            .ok_or(Malformation::BadHeader("signal report carries fewer than four values"))??;
    }
    Ok(Record::SignalStrengthReport { signals })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{FieldDescriptor, FieldType};
    use crate::dialect::DeviceFamily;
    use crate::record::FieldValue;

    fn version_banner(model: &str) -> Vec<u8> {
        let mut rec = b"00v".to_vec();
        rec.resize(24, b' ');
        rec.extend_from_slice(model.as_bytes());
        rec
    }

    #[test]
    fn classifies_zero_led_records() {
        let g = AlternateVendor;
        assert_eq!(
            g.record_kind(b"01 "),
            Scan::Kind(RecordKind::DataReport { station: b'1' })
        );
        assert_eq!(
            g.record_kind(b"01F"),
            Scan::Kind(RecordKind::SettingEcho(Setting::Format))
        );
        assert_eq!(g.record_kind(b"00u"), Scan::Kind(RecordKind::UnitStates));
        assert_eq!(g.record_kind(b"01"), Scan::NeedMoreBytes);
        // signal reports belong to the wireless model only
        assert!(matches!(
            g.record_kind(b"00@S"),
            Scan::Kind(RecordKind::Unrecognized { leading: b'0', .. })
        ));
    }

    #[test]
    fn device_lines() {
        let g = AlternateVendor;
        assert_eq!(
            g.record_kind(b"Invalid Command!\r\n"),
            Scan::Kind(RecordKind::DeviceError)
        );
        assert_eq!(g.record_kind(b"Inv"), Scan::NeedMoreBytes);
        assert_eq!(g.record_kind(b"Echo Off\r\n"), Scan::Kind(RecordKind::CommandEcho));
        assert_eq!(g.record_kind(b"Z"), Scan::Unknown);

        let table = StationTable::new();
        let rec = b"Invalid Parameter!\r\n";
        assert_eq!(
            g.record_length(RecordKind::DeviceError, rec, &table),
            Length::Known(rec.len())
        );
        assert_eq!(
            g.decode(RecordKind::DeviceError, rec, &table).unwrap(),
            Record::ErrorReport {
                code: "Invalid Parameter!".into()
            }
        );
    }

    #[test]
    fn version_length_depends_on_model() {
        let table = StationTable::new();
        let g = AlternateVendor;
        assert_eq!(
            g.record_length(RecordKind::VersionBanner, b"00v  ", &table),
            Length::NeedMoreBytes
        );
        assert_eq!(
            g.record_length(RecordKind::VersionBanner, &version_banner("Wireless"), &table),
            Length::Known(137)
        );
        assert_eq!(
            g.record_length(RecordKind::VersionBanner, &version_banner("Patriot "), &table),
            Length::Known(128)
        );
    }

    #[test]
    fn setting_echo_value() {
        let table = StationTable::new();
        let rec = b"01U  1\r\n";
        assert_eq!(
            AlternateVendor.record_length(RecordKind::SettingEcho(Setting::Units), rec, &table),
            Length::Known(8)
        );
        assert_eq!(
            AlternateVendor
                .decode(RecordKind::SettingEcho(Setting::Units), rec, &table)
                .unwrap(),
            Record::SettingEcho {
                setting: Setting::Units,
                value: Some(1)
            }
        );
    }

    #[test]
    fn wired_unit_states_read_right_to_left() {
        let table = StationTable::new();
        let rec = b"00u  01\r\n";
        assert_eq!(
            AlternateVendor.record_length(RecordKind::UnitStates, rec, &table),
            Length::Known(9)
        );
        assert_eq!(
            AlternateVendor
                .decode(RecordKind::UnitStates, rec, &table)
                .unwrap(),
            Record::StationStateReport {
                states: StationStates::All {
                    enabled: vec![true, false]
                }
            }
        );
    }

    #[test]
    fn output_list_with_three_char_codes() {
        let table = StationTable::new();
        let rec = b"01O   2  4  1 \r\n";
        let kind = RecordKind::OutputList { station: b'1' };
        assert_eq!(
            AlternateVendor.record_length(kind, rec, &table),
            Length::Known(rec.len())
        );
        match AlternateVendor.decode(kind, rec, &table).unwrap() {
            Record::OutputListDescriptor {
                station,
                descriptor,
            } => {
                assert_eq!(station, 1);
                assert_eq!(descriptor.family(), DeviceFamily::Alternate);
                assert_eq!(descriptor.record_length(), Some(4 + 27 + 27 + 2));
            }
            other => panic!("unexpected record {other:?}"),
        }
        assert_eq!(
            AlternateVendor.record_length(RecordKind::OutputList { station: b'5' }, rec, &table),
            Length::Malformed(Malformation::BadStation(b'5'))
        );
    }

    #[test]
    fn nine_character_data_fields() {
        let mut table = StationTable::new();
        table
            .apply(&Record::OutputListDescriptor {
                station: 2,
                descriptor: FieldDescriptor::new(
                    vec![FieldType::Position, FieldType::Buttons, FieldType::Crlf],
                    DeviceFamily::Alternate,
                ),
            })
            .unwrap();
        let rec = b"02     1.2500  -2.0000   3.0000  1\r\n";
        let kind = RecordKind::DataReport { station: b'2' };
        assert_eq!(
            AlternateVendor.record_length(kind, rec, &table),
            Length::Known(rec.len())
        );
        assert_eq!(
            AlternateVendor.decode(kind, rec, &table).unwrap(),
            Record::DataReport {
                station: 2,
                fields: vec![
                    FieldValue::Position([1.25, -2.0, 3.0]),
                    FieldValue::Buttons(1)
                ],
            }
        );
    }

    #[test]
    fn station_past_wired_range_is_malformed() {
        let table = StationTable::new();
        assert_eq!(
            AlternateVendor.record_length(RecordKind::DataReport { station: b'3' }, b"03 ", &table),
            Length::Malformed(Malformation::BadStation(b'3'))
        );
    }
}
