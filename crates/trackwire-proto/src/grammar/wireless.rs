use super::alternate::{alternate_decode, alternate_kind, alternate_length};
use super::{DialectGrammar, Length, Scan};
use crate::dialect::Dialect;
use crate::error::Result;
use crate::record::{Record, RecordKind};
use crate::station::StationTable;

/// Wireless model of the alternate vendor: four units, 11-byte unit states
/// and the `0?@S` signal-strength report.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlternateVendorWireless;

impl DialectGrammar for AlternateVendorWireless {
    fn dialect(&self) -> Dialect {
        Dialect::AlternateVendorWireless
    }

    fn record_kind(&self, buf: &[u8]) -> Scan {
        alternate_kind(buf, true)
    }

    fn record_length(&self, kind: RecordKind, buf: &[u8], stations: &StationTable) -> Length {
        alternate_length(self, kind, buf, stations, true)
    }

    fn decode(&self, kind: RecordKind, record: &[u8], stations: &StationTable) -> Result<Record> {
        alternate_decode(self, kind, record, stations, true)
    }
}
