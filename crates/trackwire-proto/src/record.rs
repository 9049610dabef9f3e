use serde::Serialize;

use crate::descriptor::FieldDescriptor;
use crate::error::UnsupportedReason;
use crate::station::{BeaconUnit, TrackingStatus};

/// Record families, used to attribute malformed-record counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordFamily {
    /// Station data reports.
    Data,
    /// Standard status records (`'2'`).
    Status,
    /// Vendor-extended status records (`'3'`).
    Vendor,
    /// Device messages: banners, echoes, alternate status.
    Device,
}

/// Output settings reported in a system-status record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FormatFlags {
    pub binary: bool,
    pub centimeters: bool,
    pub continuous: bool,
}

impl FormatFlags {
    pub fn from_nibble(bits: u8) -> Self {
        Self {
            binary: bits & 0x01 != 0,
            centimeters: bits & 0x02 != 0,
            continuous: bits & 0x08 != 0,
        }
    }
}

/// Enabled state carried by a station-state report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StationStates {
    Single { station: u8, enabled: bool },
    /// Index 0 is station 1.
    All { enabled: Vec<bool> },
}

/// One station's entry in a tracking-status report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StationQuality {
    pub station: u8,
    pub status: TrackingStatus,
    pub measurements: u8,
    pub rejects: u8,
}

/// A decoded payload field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Position([f32; 3]),
    Orientation([f32; 3]),
    XAxisCosines([f32; 3]),
    YAxisCosines([f32; 3]),
    ZAxisCosines([f32; 3]),
    Quaternion([f32; 4]),
    Buttons(u32),
    Joystick([i32; 2]),
    Quality(i32),
    Timestamp(u32),
    FrameCount(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BannerKind {
    /// Sent once after power-up or reset.
    Startup,
    /// Response to a version query.
    Version,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Setting {
    Format,
    Units,
}

/// One decoded device record. Produced, applied, then discarded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    SystemStatus {
        firmware: String,
        system_id: String,
        format_flags: FormatFlags,
    },
    OutputListDescriptor {
        station: u8,
        descriptor: FieldDescriptor,
    },
    StationStateReport {
        states: StationStates,
    },
    DataReport {
        station: u8,
        fields: Vec<FieldValue>,
    },
    TrackingStatusReport {
        stations: Vec<StationQuality>,
        update_rate: i32,
        genlock: char,
    },
    SignalStrengthReport {
        signals: [f32; 4],
    },
    BeaconConfig {
        beacon: BeaconUnit,
        /// Extra bytes the firmware inserted into the second field.
        quirk_bytes: usize,
    },
    VendorBanner {
        text: String,
        banner: BannerKind,
        wireless: bool,
    },
    SettingEcho {
        setting: Setting,
        value: Option<u8>,
    },
    CommandEcho {
        text: String,
    },
    ErrorReport {
        code: String,
    },
    /// A known record kind whose contents are not interpreted.
    Passthrough {
        family: RecordFamily,
        subtype: char,
        text: String,
    },
    /// A record recognized but left undecoded rather than misparsed.
    Unsupported {
        station: Option<u8>,
        reason: UnsupportedReason,
    },
}

impl Record {
    /// Short name for logs and tables.
    pub fn name(&self) -> &'static str {
        match self {
            Record::SystemStatus { .. } => "system_status",
            Record::OutputListDescriptor { .. } => "output_list",
            Record::StationStateReport { .. } => "station_state",
            Record::DataReport { .. } => "data",
            Record::TrackingStatusReport { .. } => "tracking_status",
            Record::SignalStrengthReport { .. } => "signal_strength",
            Record::BeaconConfig { .. } => "beacon_config",
            Record::VendorBanner { .. } => "banner",
            Record::SettingEcho { .. } => "setting_echo",
            Record::CommandEcho { .. } => "command_echo",
            Record::ErrorReport { .. } => "error_report",
            Record::Passthrough { .. } => "passthrough",
            Record::Unsupported { .. } => "unsupported",
        }
    }

    /// Station the record is about, when it names exactly one.
    pub fn station(&self) -> Option<u8> {
        match self {
            Record::OutputListDescriptor { station, .. } | Record::DataReport { station, .. } => {
                Some(*station)
            }
            Record::StationStateReport {
                states: StationStates::Single { station, .. },
            } => Some(*station),
            Record::Unsupported { station, .. } => *station,
            _ => None,
        }
    }
}

/// What the leading bytes of the buffer announce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// A lone space, carriage return or line feed.
    Whitespace,
    /// `station` is the raw station-id byte.
    DataReport { station: u8 },
    SystemStatus,
    OutputList { station: u8 },
    StationState,
    StatusError,
    TrackingStatus,
    BeaconConfig,
    UnitStates,
    VersionBanner,
    SettingEcho(Setting),
    SignalStrength,
    StartupBanner { wireless: bool },
    DeviceError,
    CommandEcho,
    /// Known subtype that is framed by its terminator but not parsed.
    Passthrough { family: RecordFamily, subtype: u8 },
    /// Known leading byte with a subtype the dialect does not define.
    Unrecognized { family: RecordFamily, leading: u8, subtype: u8 },
}

impl RecordKind {
    pub fn family(self) -> RecordFamily {
        match self {
            RecordKind::DataReport { .. } => RecordFamily::Data,
            RecordKind::SystemStatus
            | RecordKind::OutputList { .. }
            | RecordKind::StationState
            | RecordKind::StatusError => RecordFamily::Status,
            RecordKind::TrackingStatus | RecordKind::BeaconConfig => RecordFamily::Vendor,
            RecordKind::Passthrough { family, .. } | RecordKind::Unrecognized { family, .. } => {
                family
            }
            RecordKind::Whitespace
            | RecordKind::UnitStates
            | RecordKind::VersionBanner
            | RecordKind::SettingEcho(_)
            | RecordKind::SignalStrength
            | RecordKind::StartupBanner { .. }
            | RecordKind::DeviceError
            | RecordKind::CommandEcho => RecordFamily::Device,
        }
    }
}
