use std::time::Duration;

use serde::{Deserialize, Serialize};
use trackwire_frame::FrameConfig;
use trackwire_proto::{DeviceFamily, Hemisphere, DEFAULT_MAX_BEACONS, DEFAULT_MAX_STATIONS};
use trackwire_transport::DEFAULT_READ_CHUNK;

use crate::error::{Result, SessionError};

/// Highest station number a one-character station id can carry.
const MAX_ADDRESSABLE_STATIONS: u8 = 35;

/// Timing and retry limits for the connection handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandshakeConfig {
    /// How long to wait for each awaited response before resending the query.
    pub response_timeout_ms: u64,
    /// Queries sent per state before giving up.
    pub max_attempts: u32,
    /// Upper bound for the whole handshake.
    pub timeout_ms: u64,
    /// Pause between handshake ticks in [`Session::connect`](crate::Session::connect).
    pub tick_interval_ms: u64,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            response_timeout_ms: 500,
            max_attempts: 5,
            timeout_ms: 5_000,
            tick_interval_ms: 10,
        }
    }
}

impl HandshakeConfig {
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// Configuration for one tracker session.
///
/// Every field has a default, so a JSON config only needs the fields it
/// changes:
///
/// ```
/// use trackwire_session::SessionConfig;
///
/// let config = SessionConfig::from_json(r#"{ "family": "alternate", "button_stations": [1] }"#)?;
/// assert_eq!(config.max_stations, 12);
/// assert_eq!(config.handshake.max_attempts, 5);
/// # Ok::<(), trackwire_session::SessionError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Command set to speak before the device identifies itself.
    pub family: DeviceFamily,
    pub max_stations: u8,
    pub max_beacons: usize,
    /// Extra bytes sent verbatim at the end of identification.
    pub init_command: Option<String>,
    /// Hemisphere installed on every enabled station; `null` skips it.
    pub hemisphere: Option<Hemisphere>,
    /// Stations that also report buttons (and a joystick on standard devices).
    pub button_stations: Vec<u8>,
    /// Multiplier from device position units to caller units. The default
    /// turns inches into feet.
    pub translation_scale: f32,
    /// Re-poll an unanswered device after this long.
    pub poll_interval_ms: u64,
    /// Bytes requested per non-blocking read.
    pub read_chunk: usize,
    /// Capacity of the undecoded-input buffer.
    pub buffer_capacity: usize,
    pub handshake: HandshakeConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            family: DeviceFamily::Standard,
            max_stations: DEFAULT_MAX_STATIONS,
            max_beacons: DEFAULT_MAX_BEACONS,
            init_command: None,
            hemisphere: Some(Hemisphere::Lower),
            button_stations: Vec::new(),
            translation_scale: 1.0 / 12.0,
            poll_interval_ms: 50,
            read_chunk: DEFAULT_READ_CHUNK,
            buffer_capacity: FrameConfig::default().capacity,
            handshake: HandshakeConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Default configuration for a device family.
    pub fn for_family(family: DeviceFamily) -> Self {
        Self {
            family,
            ..Self::default()
        }
    }

    /// Parse and validate a JSON config.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: SessionConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn frame_config(&self) -> FrameConfig {
        FrameConfig {
            capacity: self.buffer_capacity,
        }
    }

    /// Reject settings no session can run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_stations == 0 || self.max_stations > MAX_ADDRESSABLE_STATIONS {
            return Err(invalid(format!(
                "max_stations must be between 1 and {MAX_ADDRESSABLE_STATIONS}, got {}",
                self.max_stations
            )));
        }
        if self.max_beacons == 0 {
            return Err(invalid("max_beacons must be at least 1"));
        }
        if self.read_chunk == 0 {
            return Err(invalid("read_chunk must be at least 1"));
        }
        if self.buffer_capacity == 0 {
            return Err(invalid("buffer_capacity must be at least 1"));
        }
        if self.handshake.max_attempts == 0 {
            return Err(invalid("handshake.max_attempts must be at least 1"));
        }
        if self.handshake.response_timeout_ms == 0 {
            return Err(invalid("handshake.response_timeout_ms must be non-zero"));
        }
        if let Some(&station) = self
            .button_stations
            .iter()
            .find(|&&s| s == 0 || s > self.max_stations)
        {
            return Err(invalid(format!(
                "button station {station} outside 1..={}",
                self.max_stations
            )));
        }
        if !self.translation_scale.is_finite() {
            return Err(invalid("translation_scale must be finite"));
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> SessionError {
    SessionError::InvalidConfig(message.into())
}
