//! Connection handshake.
//!
//! [`HandshakeSession`] is a tick-driven state machine: it never reads or
//! writes by itself. The owner feeds it every decoded record through
//! [`HandshakeSession::observe`] and transmits whatever
//! [`HandshakeSession::tick`] returns. Each awaited response has its own
//! timeout and a bounded number of attempts, so a silent or confused device
//! ends in [`SessionError::HandshakeFailed`] instead of a hang.

use std::collections::BTreeSet;
use std::fmt;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};
use trackwire_proto::{Command, DeviceFamily, Dialect, FieldType, Hemisphere, Record, StationTable};

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};

/// Handshake progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HandshakeState {
    Disconnected,
    /// Waiting for a system status (standard) or a banner (alternate).
    Identifying,
    /// Waiting for the enabled state of every station.
    StationDiscovery,
    /// Waiting for an output list from every enabled station.
    FormatNegotiation,
    SteadyState,
    Closed,
}

impl HandshakeState {
    pub const fn as_str(self) -> &'static str {
        match self {
            HandshakeState::Disconnected => "disconnected",
            HandshakeState::Identifying => "identifying",
            HandshakeState::StationDiscovery => "station_discovery",
            HandshakeState::FormatNegotiation => "format_negotiation",
            HandshakeState::SteadyState => "steady_state",
            HandshakeState::Closed => "closed",
        }
    }

    fn is_negotiating(self) -> bool {
        matches!(
            self,
            HandshakeState::Identifying
                | HandshakeState::StationDiscovery
                | HandshakeState::FormatNegotiation
        )
    }
}

impl fmt::Display for HandshakeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Command choreography that identifies a device and prepares its stations.
#[derive(Debug, Clone)]
pub struct HandshakeSession {
    family: DeviceFamily,
    dialect: Dialect,
    established: bool,
    state: HandshakeState,
    init_command: Option<Vec<u8>>,
    hemisphere: Option<Hemisphere>,
    button_stations: Vec<u8>,
    response_timeout: Duration,
    max_attempts: u32,
    started: Option<Instant>,
    /// Set once the current state's commands are out.
    deadline: Option<Instant>,
    attempts: u32,
    retries: u64,
    answered: bool,
    /// Enabled stations still missing an output list.
    pending: BTreeSet<u8>,
}

impl HandshakeSession {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            family: config.family,
            dialect: config.family.provisional_dialect(),
            established: false,
            state: HandshakeState::Disconnected,
            init_command: config.init_command.clone().map(String::into_bytes),
            hemisphere: config.hemisphere,
            button_stations: config.button_stations.clone(),
            response_timeout: config.handshake.response_timeout(),
            max_attempts: config.handshake.max_attempts,
            started: None,
            deadline: None,
            attempts: 0,
            retries: 0,
            answered: false,
            pending: BTreeSet::new(),
        }
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Dialect selected so far; the family's provisional dialect until the
    /// device identifies itself.
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn family(&self) -> DeviceFamily {
        self.family
    }

    /// Whether the device has identified itself.
    pub fn is_established(&self) -> bool {
        self.established
    }

    /// Queries sent in the current state.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Queries resent after a response timeout, over the whole handshake.
    pub fn retries(&self) -> u64 {
        self.retries
    }

    /// Start identifying the device.
    pub fn begin(&mut self, now: Instant) {
        self.started = Some(now);
        self.retries = 0;
        self.enter(HandshakeState::Identifying);
    }

    /// Skip negotiation for a device whose dialect is already known, e.g.
    /// when replaying a capture.
    pub fn establish(&mut self, dialect: Dialect) {
        self.family = dialect.family();
        self.dialect = dialect;
        self.established = true;
        self.enter(HandshakeState::SteadyState);
    }

    pub fn close(&mut self) {
        self.enter(HandshakeState::Closed);
    }

    /// Feed one decoded record, already applied to the station table.
    ///
    /// Returns the newly selected dialect when the record identified (or
    /// refined) the device.
    pub fn observe(&mut self, record: &Record) -> Option<Dialect> {
        if self.state == HandshakeState::Closed {
            return None;
        }
        let selected = self.identify(record);

        if self.deadline.is_some() {
            match (self.state, record) {
                (HandshakeState::Identifying, Record::SystemStatus { .. })
                    if self.family == DeviceFamily::Standard =>
                {
                    self.answered = true;
                }
                (HandshakeState::Identifying, Record::VendorBanner { .. })
                    if self.family == DeviceFamily::Alternate =>
                {
                    self.answered = true;
                }
                (HandshakeState::StationDiscovery, Record::StationStateReport { .. }) => {
                    self.answered = true;
                }
                (
                    HandshakeState::FormatNegotiation,
                    Record::OutputListDescriptor { station, .. },
                ) => {
                    self.pending.remove(station);
                }
                _ => {}
            }
        }
        selected
    }

    /// Advance on elapsed time and observed responses.
    ///
    /// Returns the commands to transmit, in order. Fails once a state has
    /// used up its attempts without an answer.
    pub fn tick(&mut self, now: Instant, stations: &StationTable) -> Result<Vec<Command>> {
        let mut out = Vec::new();
        while self.state.is_negotiating() {
            if self.deadline.is_none() {
                out.extend(self.state_commands());
                self.deadline = Some(now + self.response_timeout);
                self.attempts = 1;
            }
            if self.satisfied() {
                out.extend(self.advance(now, stations));
                continue;
            }
            if self.deadline.is_some_and(|deadline| now >= deadline) {
                if self.attempts >= self.max_attempts {
                    warn!(state = %self.state, attempts = self.attempts, "handshake gave up");
                    return Err(SessionError::HandshakeFailed {
                        state: self.state,
                        attempts: self.attempts,
                    });
                }
                self.attempts += 1;
                self.retries += 1;
                warn!(state = %self.state, attempt = self.attempts, "no response, resending query");
                out.extend(self.query());
                self.deadline = Some(now + self.response_timeout);
            }
            break;
        }
        Ok(out)
    }

    /// Output list requested for `station` under the current dialect.
    pub fn output_list(&self, station: u8) -> Vec<FieldType> {
        let mut fields = Vec::with_capacity(6);
        if self.dialect == Dialect::VendorExtended {
            fields.push(FieldType::TrackingQuality);
        }
        fields.extend([FieldType::Position, FieldType::Orientation]);
        if self.button_stations.contains(&station) {
            match self.family {
                DeviceFamily::Standard => fields.extend([FieldType::Buttons, FieldType::Joystick]),
                DeviceFamily::Alternate => fields.push(FieldType::Buttons),
            }
        }
        fields.push(FieldType::Crlf);
        fields
    }

    fn identify(&mut self, record: &Record) -> Option<Dialect> {
        let candidate = match (self.family, record) {
            (DeviceFamily::Standard, Record::SystemStatus { system_id, .. }) => {
                if system_id.to_ascii_lowercase().contains("is900") {
                    Dialect::VendorExtended
                } else {
                    Dialect::GenericTracker
                }
            }
            (DeviceFamily::Alternate, Record::VendorBanner { wireless, .. }) => {
                if *wireless {
                    Dialect::AlternateVendorWireless
                } else {
                    Dialect::AlternateVendor
                }
            }
            _ => return None,
        };

        if self.established && !self.dialect.can_refine_to(candidate) {
            warn!(
                dialect = %self.dialect,
                reported = %candidate,
                "ignoring conflicting identification"
            );
            return None;
        }
        if self.established && candidate == self.dialect {
            return None;
        }
        info!(dialect = %candidate, record = record.name(), "dialect selected");
        self.dialect = candidate;
        self.established = true;
        Some(candidate)
    }

    fn satisfied(&self) -> bool {
        match self.state {
            HandshakeState::Identifying | HandshakeState::StationDiscovery => self.answered,
            HandshakeState::FormatNegotiation => self.pending.is_empty(),
            _ => false,
        }
    }

    fn enter(&mut self, next: HandshakeState) {
        if next != self.state {
            debug!(from = %self.state, to = %next, "handshake transition");
        }
        self.state = next;
        self.deadline = None;
        self.attempts = 0;
        self.answered = false;
        self.pending.clear();
    }

    fn advance(&mut self, now: Instant, stations: &StationTable) -> Vec<Command> {
        let mut extra = Vec::new();
        match self.state {
            HandshakeState::Identifying => {
                if self.dialect == Dialect::AlternateVendorWireless {
                    // no polling until every output list is installed
                    extra.push(Command::AutoLaunch);
                }
                self.enter(HandshakeState::StationDiscovery);
            }
            HandshakeState::StationDiscovery => {
                if self.dialect == Dialect::VendorExtended {
                    extra.extend([Command::BeaconTable, Command::TrackingStatus]);
                }
                self.enter(HandshakeState::FormatNegotiation);
                self.pending = stations.enabled_stations().into_iter().collect();
                debug!(stations = ?self.pending, "negotiating output lists");
            }
            HandshakeState::FormatNegotiation => {
                self.enter(HandshakeState::SteadyState);
                let elapsed_ms = self
                    .started
                    .map(|t| now.saturating_duration_since(t).as_millis())
                    .unwrap_or_default();
                info!(
                    dialect = %self.dialect,
                    stations = stations.enabled_stations().len(),
                    retries = self.retries,
                    elapsed_ms,
                    "handshake complete"
                );
            }
            _ => {}
        }
        extra
    }

    /// Everything sent on entering the current state.
    fn state_commands(&self) -> Vec<Command> {
        match (self.state, self.family) {
            (HandshakeState::Identifying, DeviceFamily::Standard) => {
                let mut cmds = vec![
                    Command::PolledMode,
                    Command::Ascii,
                    Command::Inches,
                    Command::SystemStatus,
                ];
                cmds.extend(self.init_command.clone().map(Command::Raw));
                cmds
            }
            (HandshakeState::Identifying, DeviceFamily::Alternate) => {
                let mut cmds = vec![
                    Command::EchoOff,
                    Command::PolledMode,
                    Command::Ascii,
                    Command::Inches,
                    Command::Version,
                ];
                cmds.extend(self.init_command.clone().map(Command::Raw));
                cmds
            }
            (HandshakeState::StationDiscovery, _) => vec![Command::StationStates],
            (HandshakeState::FormatNegotiation, _) => {
                let configure = self.dialect != Dialect::AlternateVendorWireless;
                let mut cmds = Vec::new();
                for &station in &self.pending {
                    if configure {
                        cmds.push(Command::SetOutputList {
                            station,
                            fields: self.output_list(station),
                        });
                        if let Some(hemisphere) = self.hemisphere {
                            cmds.push(Command::SetHemisphere {
                                station,
                                hemisphere,
                            });
                        }
                    }
                    cmds.push(Command::GetOutputList { station });
                }
                cmds
            }
            _ => Vec::new(),
        }
    }

    /// What is resent after a response timeout.
    fn query(&self) -> Vec<Command> {
        match (self.state, self.family) {
            (HandshakeState::Identifying, DeviceFamily::Standard) => vec![Command::SystemStatus],
            (HandshakeState::Identifying, DeviceFamily::Alternate) => vec![Command::Version],
            (HandshakeState::StationDiscovery, _) => vec![Command::StationStates],
            (HandshakeState::FormatNegotiation, _) => self
                .pending
                .iter()
                .map(|&station| Command::GetOutputList { station })
                .collect(),
            _ => Vec::new(),
        }
    }
}
