use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::descriptor::FieldDescriptor;
use crate::error::{DecodeError, Result};
use crate::record::{FieldValue, FormatFlags, Record, Setting, StationStates};

/// Default number of addressable stations.
pub const DEFAULT_MAX_STATIONS: u8 = 12;
/// Default beacon table capacity.
pub const DEFAULT_MAX_BEACONS: usize = 100;

/// Signal below which a wireless station is reported as having no signal.
pub const NO_SIGNAL_THRESHOLD: f32 = 1e-4;
/// Signal below which a wireless station is reported as weak.
pub const LOW_SIGNAL_THRESHOLD: f32 = 5e-3;

/// Per-station tracking status as reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingStatus {
    Tracking,
    LowSignal,
    NoSignal,
    #[default]
    Unknown,
    Other(char),
}

impl TrackingStatus {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            b'T' => TrackingStatus::Tracking,
            b'L' => TrackingStatus::LowSignal,
            b'X' => TrackingStatus::NoSignal,
            b'-' => TrackingStatus::Unknown,
            other => TrackingStatus::Other(other as char),
        }
    }

    pub fn as_char(self) -> char {
        match self {
            TrackingStatus::Tracking => 'T',
            TrackingStatus::LowSignal => 'L',
            TrackingStatus::NoSignal => 'X',
            TrackingStatus::Unknown => '-',
            TrackingStatus::Other(c) => c,
        }
    }

    /// Classify a wireless signal-strength reading.
    pub fn from_signal(signal: f32) -> Self {
        if signal < NO_SIGNAL_THRESHOLD {
            TrackingStatus::NoSignal
        } else if signal < LOW_SIGNAL_THRESHOLD {
            TrackingStatus::LowSignal
        } else {
            TrackingStatus::Tracking
        }
    }
}

/// Map a signal-strength reading onto a 0..=255 quality scalar.
pub fn signal_quality(signal: f32) -> i32 {
    (signal.max(0.0).sqrt() * 256.0).min(255.0) as i32
}

/// A fixed reference transmitter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BeaconUnit {
    pub pse_id: i32,
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub hardware_id: i32,
}

/// State of one tracked body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationUnit {
    pub id: u8,
    pub enabled: bool,
    pub descriptor: Option<FieldDescriptor>,
    pub position: [f32; 3],
    /// Azimuth, elevation, roll in degrees.
    pub orientation: [f32; 3],
    pub quaternion: Option<[f32; 4]>,
    /// X, Y and Z axis direction cosines.
    pub cosines: [[f32; 3]; 3],
    pub buttons: u32,
    pub joystick: [i32; 2],
    pub quality: i32,
    pub tracking_status: TrackingStatus,
    pub measurements: u8,
    pub rejects: u8,
    pub timestamp: Option<u32>,
    pub frame_count: Option<u32>,
    /// Data reports applied so far.
    pub samples: u64,
}

impl StationUnit {
    fn new(id: u8) -> Self {
        Self {
            id,
            enabled: false,
            descriptor: None,
            position: [0.0; 3],
            orientation: [0.0; 3],
            quaternion: None,
            cosines: [[0.0; 3]; 3],
            buttons: 0,
            joystick: [0; 2],
            quality: 0,
            tracking_status: TrackingStatus::Unknown,
            measurements: 0,
            rejects: 0,
            timestamp: None,
            frame_count: None,
            samples: 0,
        }
    }

    /// Expected data report length under the installed descriptor.
    pub fn expected_len(&self) -> Option<usize> {
        self.descriptor.as_ref().and_then(|d| d.record_length())
    }

    /// Position multiplied by `scale` (device units to caller units).
    pub fn scaled_position(&self, scale: f32) -> [f32; 3] {
        self.position.map(|v| v * scale)
    }
}

/// Per-category change flags, set by [`StationTable::apply`] and cleared by
/// the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ChangeFlags {
    pub button_changed: bool,
    pub valuator_changed: bool,
    pub receiver_changed: bool,
}

impl ChangeFlags {
    pub fn any(&self) -> bool {
        self.button_changed || self.valuator_changed || self.receiver_changed
    }
}

/// Everything learned from decoded records during one session.
#[derive(Debug, Clone)]
pub struct StationTable {
    stations: BTreeMap<u8, StationUnit>,
    beacons: Vec<BeaconUnit>,
    max_stations: u8,
    max_beacons: usize,
    changes: ChangeFlags,
    format: FormatFlags,
    update_rate: Option<i32>,
    genlock: Option<char>,
    got_state: bool,
}

impl Default for StationTable {
    fn default() -> Self {
        Self::new()
    }
}

impl StationTable {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_STATIONS, DEFAULT_MAX_BEACONS)
    }

    pub fn with_limits(max_stations: u8, max_beacons: usize) -> Self {
        Self {
            stations: BTreeMap::new(),
            beacons: Vec::new(),
            max_stations,
            max_beacons,
            changes: ChangeFlags::default(),
            format: FormatFlags::default(),
            update_rate: None,
            genlock: None,
            got_state: false,
        }
    }

    pub fn max_stations(&self) -> u8 {
        self.max_stations
    }

    pub fn station(&self, id: u8) -> Option<&StationUnit> {
        self.stations.get(&id)
    }

    /// Known stations in id order.
    pub fn stations(&self) -> impl Iterator<Item = &StationUnit> {
        self.stations.values()
    }

    pub fn descriptor(&self, id: u8) -> Option<&FieldDescriptor> {
        self.stations.get(&id).and_then(|s| s.descriptor.as_ref())
    }

    /// Ids of stations reported as enabled.
    pub fn enabled_stations(&self) -> Vec<u8> {
        self.stations
            .values()
            .filter(|s| s.enabled)
            .map(|s| s.id)
            .collect()
    }

    pub fn beacons(&self) -> &[BeaconUnit] {
        &self.beacons
    }

    pub fn changes(&self) -> ChangeFlags {
        self.changes
    }

    /// Return the change flags and clear them.
    pub fn take_changes(&mut self) -> ChangeFlags {
        std::mem::take(&mut self.changes)
    }

    /// Output settings from the latest system-status record.
    pub fn format_flags(&self) -> FormatFlags {
        self.format
    }

    pub fn update_rate(&self) -> Option<i32> {
        self.update_rate
    }

    pub fn genlock(&self) -> Option<char> {
        self.genlock
    }

    /// Whether any station-state report has been applied.
    pub fn got_state(&self) -> bool {
        self.got_state
    }

    fn unit_mut(&mut self, id: u8) -> Result<&mut StationUnit> {
        if id == 0 || id > self.max_stations {
            return Err(DecodeError::StationOutOfRange {
                station: id,
                max: self.max_stations,
            });
        }
        Ok(self.unit_entry(id))
    }

    /// Callers keep `id` within `1..=max_stations`.
    fn unit_entry(&mut self, id: u8) -> &mut StationUnit {
        self.stations
            .entry(id)
            .or_insert_with(|| StationUnit::new(id))
    }

    /// Fold one record into the table.
    ///
    /// Fails without mutating anything when the record names a station past
    /// the table limit or a new beacon arrives at capacity.
    pub fn apply(&mut self, record: &Record) -> Result<()> {
        match record {
            Record::SystemStatus { format_flags, .. } => {
                self.format = *format_flags;
            }
            Record::OutputListDescriptor {
                station,
                descriptor,
            } => {
                let unit = self.unit_mut(*station)?;
                unit.descriptor = Some(descriptor.clone());
                debug!(
                    station,
                    report_len = ?unit.expected_len(),
                    "installed output list"
                );
            }
            Record::StationStateReport { states } => {
                match states {
                    StationStates::Single { station, enabled } => {
                        self.unit_mut(*station)?.enabled = *enabled;
                    }
                    StationStates::All { enabled } => {
                        for (id, &on) in (1..=self.max_stations).zip(enabled.iter()) {
                            self.unit_entry(id).enabled = on;
                        }
                    }
                }
                self.got_state = true;
            }
            Record::DataReport { station, fields } => {
                let unit = self.unit_mut(*station)?;
                let mut changes = ChangeFlags::default();
                for field in fields {
                    apply_field(unit, field, &mut changes);
                }
                unit.samples += 1;
                self.changes.button_changed |= changes.button_changed;
                self.changes.valuator_changed |= changes.valuator_changed;
                self.changes.receiver_changed |= changes.receiver_changed;
            }
            Record::TrackingStatusReport {
                stations,
                update_rate,
                genlock,
            } => {
                let max = self.max_stations;
                for q in stations.iter().filter(|q| (1..=max).contains(&q.station)) {
                    let unit = self.unit_entry(q.station);
                    unit.tracking_status = q.status;
                    unit.measurements = q.measurements;
                    unit.rejects = q.rejects;
                }
                self.update_rate = Some(*update_rate);
                self.genlock = Some(*genlock);
            }
            Record::SignalStrengthReport { signals } => {
                for (id, &signal) in (1..=self.max_stations).zip(signals.iter()) {
                    let unit = self.unit_entry(id);
                    unit.quality = signal_quality(signal);
                    unit.tracking_status = TrackingStatus::from_signal(signal);
                }
            }
            Record::BeaconConfig { beacon, .. } => self.upsert_beacon(*beacon)?,
            Record::SettingEcho {
                setting,
                value: Some(value),
            } => match setting {
                Setting::Format => self.format.binary = *value == 1,
                Setting::Units => self.format.centimeters = *value == 1,
            },
            Record::VendorBanner { .. }
            | Record::SettingEcho { value: None, .. }
            | Record::CommandEcho { .. }
            | Record::ErrorReport { .. }
            | Record::Passthrough { .. }
            | Record::Unsupported { .. } => {}
        }
        Ok(())
    }

    fn upsert_beacon(&mut self, beacon: BeaconUnit) -> Result<()> {
        if let Some(existing) = self
            .beacons
            .iter_mut()
            .find(|b| b.hardware_id == beacon.hardware_id)
        {
            *existing = beacon;
            debug!(hardware_id = beacon.hardware_id, "updated beacon");
            return Ok(());
        }
        if self.beacons.len() >= self.max_beacons {
            return Err(DecodeError::BeaconTableFull {
                capacity: self.max_beacons,
            });
        }
        debug!(hardware_id = beacon.hardware_id, "new beacon");
        self.beacons.push(beacon);
        Ok(())
    }
}

fn apply_field(unit: &mut StationUnit, field: &FieldValue, changes: &mut ChangeFlags) {
    match *field {
        FieldValue::Position(p) => {
            unit.position = p;
            changes.receiver_changed = true;
        }
        FieldValue::Orientation(o) => {
            unit.orientation = o;
            changes.receiver_changed = true;
        }
        FieldValue::XAxisCosines(c) => {
            unit.cosines[0] = c;
            changes.receiver_changed = true;
        }
        FieldValue::YAxisCosines(c) => {
            unit.cosines[1] = c;
            changes.receiver_changed = true;
        }
        FieldValue::ZAxisCosines(c) => {
            unit.cosines[2] = c;
            changes.receiver_changed = true;
        }
        FieldValue::Quaternion(q) => {
            unit.quaternion = Some(q);
            changes.receiver_changed = true;
        }
        FieldValue::Buttons(b) => {
            unit.buttons = b;
            changes.button_changed = true;
        }
        FieldValue::Joystick(j) => {
            unit.joystick = j;
            changes.valuator_changed = true;
        }
        FieldValue::Quality(q) => unit.quality = q,
        FieldValue::Timestamp(t) => unit.timestamp = Some(t),
        FieldValue::FrameCount(n) => unit.frame_count = Some(n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::FieldType;
    use crate::dialect::DeviceFamily;
    use crate::record::StationQuality;

    fn pose_descriptor() -> FieldDescriptor {
        FieldDescriptor::new(
            vec![FieldType::Position, FieldType::Orientation, FieldType::Crlf],
            DeviceFamily::Standard,
        )
    }

    #[test]
    fn output_list_installs_descriptor() {
        let mut table = StationTable::new();
        table
            .apply(&Record::OutputListDescriptor {
                station: 1,
                descriptor: pose_descriptor(),
            })
            .unwrap();

        assert_eq!(table.station(1).unwrap().expected_len(), Some(47));
    }

    #[test]
    fn data_report_sets_pose_and_flags() {
        let mut table = StationTable::new();
        table
            .apply(&Record::DataReport {
                station: 2,
                fields: vec![
                    FieldValue::Position([1.0, 2.0, 3.0]),
                    FieldValue::Buttons(5),
                    FieldValue::Joystick([10, -10]),
                ],
            })
            .unwrap();

        let unit = table.station(2).unwrap();
        assert_eq!(unit.position, [1.0, 2.0, 3.0]);
        assert_eq!(unit.buttons, 5);
        assert_eq!(unit.samples, 1);

        let changes = table.take_changes();
        assert!(changes.receiver_changed && changes.button_changed && changes.valuator_changed);
        assert!(!table.changes().any());
    }

    #[test]
    fn quality_alone_sets_no_flag() {
        let mut table = StationTable::new();
        table
            .apply(&Record::DataReport {
                station: 1,
                fields: vec![FieldValue::Quality(3)],
            })
            .unwrap();
        assert!(!table.changes().any());
        assert_eq!(table.station(1).unwrap().quality, 3);
    }

    #[test]
    fn out_of_range_station_is_rejected_without_mutation() {
        let mut table = StationTable::with_limits(4, 2);
        let err = table
            .apply(&Record::DataReport {
                station: 5,
                fields: vec![FieldValue::Position([1.0; 3])],
            })
            .unwrap_err();

        assert!(matches!(
            err,
            DecodeError::StationOutOfRange { station: 5, max: 4 }
        ));
        assert_eq!(table.stations().count(), 0);
        assert!(!table.changes().any());
    }

    #[test]
    fn all_station_states_are_clamped() {
        let mut table = StationTable::with_limits(4, 2);
        let mut enabled = vec![false; 32];
        enabled[0] = true;
        enabled[2] = true;
        enabled[20] = true;
        table
            .apply(&Record::StationStateReport {
                states: StationStates::All { enabled },
            })
            .unwrap();

        assert_eq!(table.enabled_stations(), vec![1, 3]);
        assert_eq!(table.stations().count(), 4);
        assert!(table.got_state());
    }

    #[test]
    fn beacons_upsert_by_hardware_id() {
        let mut table = StationTable::with_limits(12, 2);
        let beacon = |hw: i32, x: f32| BeaconUnit {
            pse_id: 1,
            position: [x, 0.0, 0.0],
            normal: [0.0, 0.0, 1.0],
            hardware_id: hw,
        };
        let record = |b| Record::BeaconConfig {
            beacon: b,
            quirk_bytes: 0,
        };

        table.apply(&record(beacon(7, 1.0))).unwrap();
        table.apply(&record(beacon(8, 2.0))).unwrap();
        table.apply(&record(beacon(7, 3.0))).unwrap();
        assert_eq!(table.beacons().len(), 2);
        assert_eq!(table.beacons()[0].position[0], 3.0);

        let err = table.apply(&record(beacon(9, 0.0))).unwrap_err();
        assert!(matches!(err, DecodeError::BeaconTableFull { capacity: 2 }));
    }

    #[test]
    fn tracking_status_updates_stations_and_session_fields() {
        let mut table = StationTable::new();
        table
            .apply(&Record::TrackingStatusReport {
                stations: vec![StationQuality {
                    station: 1,
                    status: TrackingStatus::Tracking,
                    measurements: 10,
                    rejects: 1,
                }],
                update_rate: 180,
                genlock: '0',
            })
            .unwrap();

        let unit = table.station(1).unwrap();
        assert_eq!(unit.tracking_status, TrackingStatus::Tracking);
        assert_eq!((unit.measurements, unit.rejects), (10, 1));
        assert_eq!(table.update_rate(), Some(180));
        assert_eq!(table.genlock(), Some('0'));
    }

    #[test]
    fn tracking_status_keeps_per_station_counts_and_skips_out_of_range() {
        let mut table = StationTable::with_limits(4, 2);
        let quality = |station, status, measurements, rejects| StationQuality {
            station,
            status,
            measurements,
            rejects,
        };
        table
            .apply(&Record::TrackingStatusReport {
                stations: vec![
                    quality(0, TrackingStatus::Tracking, 9, 9),
                    quality(1, TrackingStatus::Tracking, 10, 1),
                    quality(3, TrackingStatus::LowSignal, 4, 2),
                    quality(7, TrackingStatus::NoSignal, 15, 15),
                ],
                update_rate: 120,
                genlock: '1',
            })
            .unwrap();

        let ids: Vec<u8> = table.stations().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 3]);
        let first = table.station(1).unwrap();
        assert_eq!((first.measurements, first.rejects), (10, 1));
        let third = table.station(3).unwrap();
        assert_eq!(third.tracking_status, TrackingStatus::LowSignal);
        assert_eq!((third.measurements, third.rejects), (4, 2));
        assert_eq!(table.update_rate(), Some(120));
    }

    #[test]
    fn signal_strengths_past_the_limit_are_ignored() {
        let mut table = StationTable::with_limits(2, 2);
        table
            .apply(&Record::SignalStrengthReport {
                signals: [0.25, 0.001, 1.0, 1.0],
            })
            .unwrap();

        assert_eq!(table.stations().count(), 2);
        assert_eq!(table.station(1).unwrap().quality, 128);
        assert_eq!(
            table.station(2).unwrap().tracking_status,
            TrackingStatus::LowSignal
        );
        assert!(table.station(3).is_none());
    }

    #[test]
    fn format_echo_tracks_binary_mode() {
        let mut table = StationTable::new();
        table
            .apply(&Record::SettingEcho {
                setting: Setting::Format,
                value: Some(1),
            })
            .unwrap();
        assert!(table.format_flags().binary);
        table
            .apply(&Record::SettingEcho {
                setting: Setting::Format,
                value: Some(0),
            })
            .unwrap();
        assert!(!table.format_flags().binary);
    }

    #[test]
    fn signal_thresholds() {
        assert_eq!(TrackingStatus::from_signal(0.00005), TrackingStatus::NoSignal);
        assert_eq!(TrackingStatus::from_signal(0.001), TrackingStatus::LowSignal);
        assert_eq!(TrackingStatus::from_signal(0.25), TrackingStatus::Tracking);
        assert_eq!(signal_quality(0.25), 128);
        assert_eq!(signal_quality(1.0), 255);
        assert_eq!(signal_quality(-1.0), 0);
    }
}
