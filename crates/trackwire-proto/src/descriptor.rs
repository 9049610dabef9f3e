use serde::Serialize;

use crate::dialect::DeviceFamily;

/// One entry of a station's output list.
///
/// Wire codes differ between families (code 7 is a cosine triple on standard
/// devices and a quaternion on alternate ones), so a `FieldType` is always
/// created through [`FieldType::from_code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Space,
    Crlf,
    Position,
    PositionHiRes,
    /// Azimuth, elevation, roll.
    Orientation,
    OrientationHiRes,
    XAxisCosines,
    YAxisCosines,
    ZAxisCosines,
    DirectionCosineMatrix,
    Quaternion,
    Stylus,
    Buttons,
    Joystick,
    TrackingQuality,
    Timestamp,
    FrameCount,
    /// 16-bit binary layouts.
    Binary(u8),
    Unknown(u8),
}

impl FieldType {
    pub fn from_code(code: u8, family: DeviceFamily) -> FieldType {
        match family {
            DeviceFamily::Standard => match code {
                0 => FieldType::Space,
                1 => FieldType::Crlf,
                2 => FieldType::Position,
                4 => FieldType::Orientation,
                5 => FieldType::XAxisCosines,
                6 => FieldType::YAxisCosines,
                7 => FieldType::ZAxisCosines,
                11 => FieldType::Quaternion,
                16 => FieldType::Stylus,
                18..=21 => FieldType::Binary(code),
                22 => FieldType::Buttons,
                23 => FieldType::Joystick,
                40 => FieldType::TrackingQuality,
                _ => FieldType::Unknown(code),
            },
            DeviceFamily::Alternate => match code {
                0 => FieldType::Space,
                1 => FieldType::Crlf,
                2 => FieldType::Position,
                3 => FieldType::PositionHiRes,
                4 => FieldType::Orientation,
                5 => FieldType::OrientationHiRes,
                6 => FieldType::DirectionCosineMatrix,
                7 => FieldType::Quaternion,
                8 => FieldType::Timestamp,
                9 => FieldType::FrameCount,
                10 => FieldType::Buttons,
                _ => FieldType::Unknown(code),
            },
        }
    }

    /// Wire code used to request this field, if the family has one.
    pub fn code(self, family: DeviceFamily) -> Option<u8> {
        let code = match (family, self) {
            (_, FieldType::Space) => 0,
            (_, FieldType::Crlf) => 1,
            (_, FieldType::Position) => 2,
            (_, FieldType::Orientation) => 4,
            (DeviceFamily::Standard, FieldType::XAxisCosines) => 5,
            (DeviceFamily::Standard, FieldType::YAxisCosines) => 6,
            (DeviceFamily::Standard, FieldType::ZAxisCosines) => 7,
            (DeviceFamily::Standard, FieldType::Quaternion) => 11,
            (DeviceFamily::Standard, FieldType::Stylus) => 16,
            (DeviceFamily::Standard, FieldType::Binary(code)) => code,
            (DeviceFamily::Standard, FieldType::Buttons) => 22,
            (DeviceFamily::Standard, FieldType::Joystick) => 23,
            (DeviceFamily::Standard, FieldType::TrackingQuality) => 40,
            (DeviceFamily::Alternate, FieldType::PositionHiRes) => 3,
            (DeviceFamily::Alternate, FieldType::OrientationHiRes) => 5,
            (DeviceFamily::Alternate, FieldType::DirectionCosineMatrix) => 6,
            (DeviceFamily::Alternate, FieldType::Quaternion) => 7,
            (DeviceFamily::Alternate, FieldType::Timestamp) => 8,
            (DeviceFamily::Alternate, FieldType::FrameCount) => 9,
            (DeviceFamily::Alternate, FieldType::Buttons) => 10,
            (_, FieldType::Unknown(code)) => code,
            _ => return None,
        };
        Some(code)
    }

    /// Bytes this field occupies in an ASCII data report, or `None` when the
    /// layout is not supported.
    pub fn width(self, family: DeviceFamily) -> Option<usize> {
        let w = family.field_width().chars();
        match (family, self) {
            (_, FieldType::Space) => Some(1),
            (_, FieldType::Crlf) => Some(2),
            (_, FieldType::Position | FieldType::Orientation) => Some(3 * w),
            (_, FieldType::Quaternion) => Some(4 * w),
            (
                DeviceFamily::Standard,
                FieldType::XAxisCosines | FieldType::YAxisCosines | FieldType::ZAxisCosines,
            ) => Some(3 * w),
            (DeviceFamily::Standard, FieldType::Stylus) => Some(1),
            // four digits plus a trailing space
            (DeviceFamily::Standard, FieldType::Buttons) => Some(5),
            (DeviceFamily::Standard, FieldType::Joystick) => Some(8),
            (DeviceFamily::Standard, FieldType::TrackingQuality) => Some(4),
            (
                DeviceFamily::Alternate,
                FieldType::PositionHiRes | FieldType::OrientationHiRes,
            ) => Some(3 * HI_RES_WIDTH),
            (DeviceFamily::Alternate, FieldType::Timestamp | FieldType::FrameCount) => Some(10),
            (DeviceFamily::Alternate, FieldType::Buttons) => Some(3),
            _ => None,
        }
    }
}

/// Width of one high-resolution component on alternate devices.
pub const HI_RES_WIDTH: usize = 15;

/// Ordered output list learned for one station.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDescriptor {
    fields: Vec<FieldType>,
    family: DeviceFamily,
}

impl FieldDescriptor {
    pub fn new(fields: Vec<FieldType>, family: DeviceFamily) -> Self {
        Self { fields, family }
    }

    /// Bytes preceding the first field of a data report.
    pub const fn header_len(family: DeviceFamily) -> usize {
        match family {
            DeviceFamily::Standard => 3,
            DeviceFamily::Alternate => 4,
        }
    }

    pub fn fields(&self) -> &[FieldType] {
        &self.fields
    }

    pub fn family(&self) -> DeviceFamily {
        self.family
    }

    /// First field without a supported ASCII layout.
    pub fn first_unsupported(&self) -> Option<FieldType> {
        self.fields
            .iter()
            .copied()
            .find(|f| f.width(self.family).is_none())
    }

    /// Total length of a data report for this descriptor, header included.
    pub fn record_length(&self) -> Option<usize> {
        self.fields
            .iter()
            .try_fold(Self::header_len(self.family), |len, f| {
                f.width(self.family).map(|w| len + w)
            })
    }

    /// Wire codes in order, skipping fields the family cannot request.
    pub fn codes(&self) -> Vec<u8> {
        self.fields
            .iter()
            .filter_map(|f| f.code(self.family))
            .collect()
    }
}
