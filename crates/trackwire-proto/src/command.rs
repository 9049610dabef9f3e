//! Host-to-device commands.
//!
//! The two device families share intent but not spelling: the standard
//! family uses single letters and mixed line endings, the alternate family
//! uses control characters and always ends with `'\r'`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use trackwire_frame::station_to_char;

use crate::descriptor::FieldType;
use crate::dialect::DeviceFamily;

/// Tracking hemisphere, given as the axis pointing into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Hemisphere {
    Fore,
    Aft,
    Right,
    Left,
    #[default]
    Lower,
    Upper,
}

impl Hemisphere {
    pub const fn vector(self) -> [i8; 3] {
        match self {
            Hemisphere::Fore => [1, 0, 0],
            Hemisphere::Aft => [-1, 0, 0],
            Hemisphere::Right => [0, 1, 0],
            Hemisphere::Left => [0, -1, 0],
            Hemisphere::Lower => [0, 0, 1],
            Hemisphere::Upper => [0, 0, -1],
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Hemisphere::Fore => "fore",
            Hemisphere::Aft => "aft",
            Hemisphere::Right => "right",
            Hemisphere::Left => "left",
            Hemisphere::Lower => "lower",
            Hemisphere::Upper => "upper",
        }
    }
}

impl fmt::Display for Hemisphere {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Hemisphere {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fore" => Ok(Hemisphere::Fore),
            "aft" => Ok(Hemisphere::Aft),
            "right" => Ok(Hemisphere::Right),
            "left" => Ok(Hemisphere::Left),
            "lower" => Ok(Hemisphere::Lower),
            "upper" => Ok(Hemisphere::Upper),
            other => Err(format!("unknown hemisphere '{other}'")),
        }
    }
}

/// A command the host can send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Request one record set.
    Poll,
    /// Only send records when polled.
    PolledMode,
    ContinuousMode,
    Ascii,
    Binary,
    Inches,
    Centimeters,
    SystemStatus,
    /// Enabled state of every station.
    StationStates,
    GetOutputList {
        station: u8,
    },
    SetOutputList {
        station: u8,
        fields: Vec<FieldType>,
    },
    SetHemisphere {
        station: u8,
        hemisphere: Hemisphere,
    },
    /// Vendor beacon table.
    BeaconTable,
    /// Vendor tracking-status report.
    TrackingStatus,
    /// Vendor per-station status.
    StationStatus,
    Lights(bool),
    EchoOff,
    Version,
    AutoLaunch,
    SignalStrength,
    WarmReset,
    /// Bytes sent verbatim.
    Raw(Vec<u8>),
}

impl Command {
    /// Wire bytes for `family`, or `None` when the family has no such
    /// command.
    pub fn encode(&self, family: DeviceFamily) -> Option<Vec<u8>> {
        match family {
            DeviceFamily::Standard => self.encode_standard(),
            DeviceFamily::Alternate => self.encode_alternate(),
        }
    }

    fn encode_standard(&self) -> Option<Vec<u8>> {
        let bytes = match self {
            Command::Poll => b"P".to_vec(),
            Command::PolledMode => b"c".to_vec(),
            Command::ContinuousMode => b"C".to_vec(),
            Command::Ascii => b"F".to_vec(),
            Command::Binary => b"f".to_vec(),
            Command::Inches => b"U".to_vec(),
            Command::Centimeters => b"u".to_vec(),
            Command::SystemStatus => b"S".to_vec(),
            Command::StationStates => b"l*\n".to_vec(),
            Command::GetOutputList { station } => {
                format!("O{}\r", station_char(*station)?).into_bytes()
            }
            Command::SetOutputList { station, fields } => format!(
                "O{},{}\n\r",
                station_char(*station)?,
                join_codes(fields, DeviceFamily::Standard)
            )
            .into_bytes(),
            Command::SetHemisphere {
                station,
                hemisphere,
            } => hemisphere_command(station_char(*station)?, *hemisphere),
            Command::BeaconTable => b"MCF\n".to_vec(),
            Command::TrackingStatus => b"MP\n".to_vec(),
            Command::StationStatus => b"MS\n".to_vec(),
            Command::Lights(true) => b"ML1\n".to_vec(),
            Command::Lights(false) => b"ML0\n".to_vec(),
            Command::WarmReset => b"\x19".to_vec(),
            Command::Raw(bytes) => bytes.clone(),
            Command::EchoOff
            | Command::Version
            | Command::AutoLaunch
            | Command::SignalStrength => return None,
        };
        Some(bytes)
    }

    fn encode_alternate(&self) -> Option<Vec<u8>> {
        let bytes = match self {
            Command::Poll => b"P".to_vec(),
            Command::PolledMode => b"p".to_vec(),
            Command::ContinuousMode => b"C\r".to_vec(),
            Command::Ascii => b"F0\r".to_vec(),
            Command::Binary => b"F1\r".to_vec(),
            Command::Inches => b"U0\r".to_vec(),
            Command::Centimeters => b"U1\r".to_vec(),
            Command::StationStates => b"\x151\r".to_vec(),
            Command::GetOutputList { station } => format!("O{station}\r").into_bytes(),
            Command::SetOutputList { station, fields } => format!(
                "O{station},{}\r",
                join_codes(fields, DeviceFamily::Alternate)
            )
            .into_bytes(),
            Command::SetHemisphere {
                station,
                hemisphere,
            } => hemisphere_command(station_char(*station)?, *hemisphere),
            Command::EchoOff => b"\x050\r".to_vec(),
            Command::Version => b"\x16\r".to_vec(),
            Command::AutoLaunch => b"@A1\r".to_vec(),
            Command::SignalStrength => b"@S\r".to_vec(),
            Command::WarmReset => b"\x19\r".to_vec(),
            Command::Raw(bytes) => bytes.clone(),
            Command::SystemStatus
            | Command::BeaconTable
            | Command::TrackingStatus
            | Command::StationStatus
            | Command::Lights(_) => return None,
        };
        Some(bytes)
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Poll => "poll",
            Command::PolledMode => "polled_mode",
            Command::ContinuousMode => "continuous_mode",
            Command::Ascii => "ascii",
            Command::Binary => "binary",
            Command::Inches => "inches",
            Command::Centimeters => "centimeters",
            Command::SystemStatus => "system_status",
            Command::StationStates => "station_states",
            Command::GetOutputList { .. } => "get_output_list",
            Command::SetOutputList { .. } => "set_output_list",
            Command::SetHemisphere { .. } => "set_hemisphere",
            Command::BeaconTable => "beacon_table",
            Command::TrackingStatus => "tracking_status",
            Command::StationStatus => "station_status",
            Command::Lights(_) => "lights",
            Command::EchoOff => "echo_off",
            Command::Version => "version",
            Command::AutoLaunch => "auto_launch",
            Command::SignalStrength => "signal_strength",
            Command::WarmReset => "warm_reset",
            Command::Raw(_) => "raw",
        }
    }
}

fn station_char(station: u8) -> Option<char> {
    station_to_char(station).map(char::from)
}

fn join_codes(fields: &[FieldType], family: DeviceFamily) -> String {
    fields
        .iter()
        .filter_map(|f| f.code(family))
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn hemisphere_command(station: char, hemisphere: Hemisphere) -> Vec<u8> {
    let [x, y, z] = hemisphere.vector();
    format!("H{station},{x},{y},{z}\r").into_bytes()
}
