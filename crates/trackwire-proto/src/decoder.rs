//! Resumable record extraction.
//!
//! [`RecordDecoder::next_record`] inspects the front of a
//! [`FrameAccumulator`], consumes at most one record, and stops as soon as
//! it needs bytes that have not arrived. Partial records stay buffered;
//! calling it again after more input resumes exactly where it stopped.

use serde::Serialize;
use tracing::{debug, trace, warn};
use trackwire_frame::{station_from_char, FrameAccumulator};

use crate::error::{DecodeError, Malformation};
use crate::grammar::{DialectGrammar, Length, Scan, TERMINATOR};
use crate::record::{Record, RecordFamily, RecordKind};
use crate::resync::ResyncPolicy;
use crate::station::StationTable;

/// Counters kept by a decoder. Nothing in steady-state decoding is fatal;
/// every discarded byte or record shows up here instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DecodeStats {
    pub bad_data_packets: u64,
    pub bad_status_records: u64,
    pub bad_vendor_records: u64,
    pub bad_device_messages: u64,
    /// Contiguous runs of unrecognized leading bytes.
    pub unknown_records: u64,
    pub skipped_bytes: u64,
    pub unsupported_records: u64,
    pub station_out_of_range: u64,
    pub beacon_table_full: u64,
    pub resyncs: u64,
    pub records_decoded: u64,
}

impl DecodeStats {
    /// Malformed-record counter for a record family.
    pub fn malformed_for(&self, family: RecordFamily) -> u64 {
        match family {
            RecordFamily::Data => self.bad_data_packets,
            RecordFamily::Status => self.bad_status_records,
            RecordFamily::Vendor => self.bad_vendor_records,
            RecordFamily::Device => self.bad_device_messages,
        }
    }

    /// Sum of the per-family malformed counters.
    pub fn malformed(&self) -> u64 {
        self.bad_data_packets
            + self.bad_status_records
            + self.bad_vendor_records
            + self.bad_device_messages
    }

    fn count_malformed(&mut self, family: RecordFamily) {
        let counter = match family {
            RecordFamily::Data => &mut self.bad_data_packets,
            RecordFamily::Status => &mut self.bad_status_records,
            RecordFamily::Vendor => &mut self.bad_vendor_records,
            RecordFamily::Device => &mut self.bad_device_messages,
        };
        *counter += 1;
    }
}

/// Streaming record decoder.
///
/// Holds only recovery state and counters; the bytes live in the caller's
/// accumulator and the station descriptors in the caller's table.
#[derive(Debug, Default)]
pub struct RecordDecoder {
    resyncing: bool,
    in_garbage: bool,
    stats: DecodeStats,
}

impl RecordDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> &DecodeStats {
        &self.stats
    }

    /// Whether a malformed record is still being skipped.
    pub fn is_resyncing(&self) -> bool {
        self.resyncing
    }

    /// Forget recovery state, e.g. after the caller cleared the buffer.
    pub fn reset(&mut self) {
        self.resyncing = false;
        self.in_garbage = false;
    }

    /// Decode the next complete record, consuming its bytes.
    ///
    /// Returns `None` when the buffer is empty or ends in a partial record.
    /// The record is not applied to `stations`.
    pub fn next_record(
        &mut self,
        acc: &mut FrameAccumulator,
        grammar: &dyn DialectGrammar,
        stations: &StationTable,
    ) -> Option<Record> {
        loop {
            if self.resyncing {
                let skip = ResyncPolicy::scan(acc.buffered())?;
                acc.consume(skip);
                self.resyncing = false;
                self.in_garbage = false;
                self.stats.resyncs += 1;
                debug!(skipped = skip, "resynchronized at terminator");
                continue;
            }

            let buf = acc.buffered();
            let &lead = buf.first()?;
            let kind = match grammar.record_kind(buf) {
                Scan::NeedMoreBytes => return None,
                Scan::Unknown => {
                    self.skip_garbage(acc, lead);
                    continue;
                }
                Scan::Kind(RecordKind::Whitespace) => {
                    acc.consume(1);
                    if lead == TERMINATOR {
                        self.in_garbage = false;
                    }
                    continue;
                }
                Scan::Kind(kind) => kind,
            };

            match grammar.record_length(kind, buf, stations) {
                Length::NeedMoreBytes => return None,
                Length::Malformed(malformation) => {
                    self.reject(kind, malformation);
                }
                Length::Unsupported(reason) => {
                    self.stats.unsupported_records += 1;
                    self.resyncing = true;
                    debug!(?kind, ?reason, "unsupported record encoding");
                    return Some(Record::Unsupported {
                        station: station_of(kind),
                        reason,
                    });
                }
                Length::Known(len) if len == 0 || len > acc.capacity() => {
                    self.reject(kind, Malformation::ImplausibleLength(len));
                }
                Length::Known(len) => {
                    let record = acc.peek(len)?;
                    let last = record[len - 1];
                    if last != TERMINATOR {
                        self.reject(
                            kind,
                            Malformation::MissingTerminator {
                                offset: len - 1,
                                found: last,
                            },
                        );
                        continue;
                    }

                    let decoded = grammar.decode(kind, record, stations);
                    acc.consume(len);
                    match decoded {
                        Ok(record) => {
                            self.in_garbage = false;
                            self.stats.records_decoded += 1;
                            trace!(record = record.name(), len, "decoded record");
                            return Some(record);
                        }
                        Err(DecodeError::UnsupportedEncoding(reason)) => {
                            self.stats.unsupported_records += 1;
                            return Some(Record::Unsupported {
                                station: station_of(kind),
                                reason,
                            });
                        }
                        Err(err) => self.count_failure(kind, &err),
                    }
                }
            }
        }
    }

    /// Decode every complete record in the buffer, applying each to
    /// `stations` before the next is decoded.
    pub fn drain(
        &mut self,
        acc: &mut FrameAccumulator,
        grammar: &dyn DialectGrammar,
        stations: &mut StationTable,
    ) -> Vec<Record> {
        let mut records = Vec::new();
        while let Some(record) = self.next_record(acc, grammar, stations) {
            self.apply(stations, &record);
            records.push(record);
        }
        records
    }

    /// Apply a decoded record, turning table rejections into counters.
    ///
    /// Returns whether the table accepted the record.
    pub fn apply(&mut self, stations: &mut StationTable, record: &Record) -> bool {
        match stations.apply(record) {
            Ok(()) => true,
            Err(err) => {
                match err {
                    DecodeError::StationOutOfRange { .. } => self.stats.station_out_of_range += 1,
                    DecodeError::BeaconTableFull { .. } => self.stats.beacon_table_full += 1,
                    _ => {}
                }
                warn!(record = record.name(), error = %err, "record not applied");
                false
            }
        }
    }

    fn skip_garbage(&mut self, acc: &mut FrameAccumulator, lead: u8) {
        acc.consume(1);
        self.stats.skipped_bytes += 1;
        if !self.in_garbage {
            self.in_garbage = true;
            self.stats.unknown_records += 1;
            debug!(byte = lead, "unrecognized leading byte");
        } else {
            trace!(byte = lead, "skipped byte");
        }
    }

    /// Count a record that failed framing and start skipping to the next
    /// terminator.
    fn reject(&mut self, kind: RecordKind, malformation: Malformation) {
        if let Malformation::BadStation(_) = malformation {
            self.stats.station_out_of_range += 1;
        } else {
            self.stats.count_malformed(kind.family());
        }
        warn!(?kind, error = %malformation, "malformed record, resyncing");
        self.resyncing = true;
    }

    /// Count a framed record whose contents failed to decode. Its bytes are
    /// already consumed.
    fn count_failure(&mut self, kind: RecordKind, err: &DecodeError) {
        match err {
            DecodeError::StationOutOfRange { .. }
            | DecodeError::Malformed(Malformation::BadStation(_)) => {
                self.stats.station_out_of_range += 1
            }
            _ => self.stats.count_malformed(kind.family()),
        }
        warn!(?kind, error = %err, "record discarded");
    }
}

fn station_of(kind: RecordKind) -> Option<u8> {
    match kind {
        RecordKind::DataReport { station } | RecordKind::OutputList { station } => {
            station_from_char(station)
        }
        _ => None,
    }
}
