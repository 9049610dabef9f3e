use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use trackwire_frame::FieldWidth;

use crate::grammar::{
    AlternateVendor, AlternateVendorWireless, DialectGrammar, GenericTracker, VendorExtended,
};

/// Command set a device speaks before its exact dialect is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceFamily {
    /// Single-letter command set with 7-character fields (generic and
    /// vendor-extended trackers).
    #[default]
    Standard,
    /// Control-character command set with 9-character fields.
    Alternate,
}

impl DeviceFamily {
    pub const fn field_width(self) -> FieldWidth {
        match self {
            DeviceFamily::Standard => FieldWidth::Generic,
            DeviceFamily::Alternate => FieldWidth::Alternate,
        }
    }

    /// Dialect assumed until the device identifies itself.
    pub const fn provisional_dialect(self) -> Dialect {
        match self {
            DeviceFamily::Standard => Dialect::GenericTracker,
            DeviceFamily::Alternate => Dialect::AlternateVendor,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            DeviceFamily::Standard => "standard",
            DeviceFamily::Alternate => "alternate",
        }
    }
}

impl fmt::Display for DeviceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "standard" => Ok(DeviceFamily::Standard),
            "alternate" => Ok(DeviceFamily::Alternate),
            other => Err(format!("unknown device family '{other}'")),
        }
    }
}

/// Wire dialect spoken by a connected device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Dialect {
    GenericTracker,
    VendorExtended,
    AlternateVendor,
    AlternateVendorWireless,
}

static GENERIC: GenericTracker = GenericTracker;
static VENDOR: VendorExtended = VendorExtended;
static ALTERNATE: AlternateVendor = AlternateVendor;
static WIRELESS: AlternateVendorWireless = AlternateVendorWireless;

impl Dialect {
    pub const ALL: [Dialect; 4] = [
        Dialect::GenericTracker,
        Dialect::VendorExtended,
        Dialect::AlternateVendor,
        Dialect::AlternateVendorWireless,
    ];

    pub const fn family(self) -> DeviceFamily {
        match self {
            Dialect::GenericTracker | Dialect::VendorExtended => DeviceFamily::Standard,
            Dialect::AlternateVendor | Dialect::AlternateVendorWireless => DeviceFamily::Alternate,
        }
    }

    /// Highest station number the dialect can address.
    pub const fn max_stations(self) -> u8 {
        match self {
            Dialect::GenericTracker | Dialect::VendorExtended => 12,
            Dialect::AlternateVendor => 2,
            Dialect::AlternateVendorWireless => 4,
        }
    }

    /// Whether an established dialect may be replaced by `next`.
    ///
    /// Only the wired alternate dialect can be refined, once the device
    /// reveals itself as wireless.
    pub fn can_refine_to(self, next: Dialect) -> bool {
        self == next
            || (self == Dialect::AlternateVendor && next == Dialect::AlternateVendorWireless)
    }

    /// Grammar implementing this dialect.
    pub fn grammar(self) -> &'static dyn DialectGrammar {
        match self {
            Dialect::GenericTracker => &GENERIC,
            Dialect::VendorExtended => &VENDOR,
            Dialect::AlternateVendor => &ALTERNATE,
            Dialect::AlternateVendorWireless => &WIRELESS,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Dialect::GenericTracker => "generic-tracker",
            Dialect::VendorExtended => "vendor-extended",
            Dialect::AlternateVendor => "alternate-vendor",
            Dialect::AlternateVendorWireless => "alternate-vendor-wireless",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dialect::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown dialect '{s}'"))
    }
}
