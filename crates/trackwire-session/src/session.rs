use std::time::Instant;

use tracing::{debug, info, warn};
use trackwire_frame::{FrameAccumulator, FrameError};
use trackwire_proto::{
    ChangeFlags, Command, DecodeStats, Dialect, Record, RecordDecoder, StationTable,
};
use trackwire_transport::Transport;

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::handshake::{HandshakeSession, HandshakeState};

/// Reads per handshake step before yielding back to the tick.
const MAX_HANDSHAKE_READS: usize = 16;

/// One connected tracker.
///
/// Owns the transport exclusively, along with everything decoded from it:
/// the undecoded input, the decoder's recovery state and counters, and the
/// station table. Nothing is shared between sessions.
#[derive(Debug)]
pub struct Session<T: Transport> {
    transport: T,
    config: SessionConfig,
    acc: FrameAccumulator,
    decoder: RecordDecoder,
    stations: StationTable,
    handshake: HandshakeSession,
    last_poll: Option<Instant>,
    poll_answered: bool,
    closed: bool,
}

impl<T: Transport> Session<T> {
    /// Wrap a transport. Nothing is sent until [`Session::connect`].
    pub fn new(transport: T, config: SessionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            transport,
            acc: FrameAccumulator::with_config(config.frame_config()),
            decoder: RecordDecoder::new(),
            stations: StationTable::with_limits(config.max_stations, config.max_beacons),
            handshake: HandshakeSession::new(&config),
            last_poll: None,
            poll_answered: false,
            closed: false,
            config,
        })
    }

    /// Wrap a transport whose device is already configured and speaks
    /// `dialect`, skipping the handshake.
    pub fn established(transport: T, config: SessionConfig, dialect: Dialect) -> Result<Self> {
        let mut session = Self::new(transport, config)?;
        session.handshake.establish(dialect);
        info!(%dialect, "session established without handshake");
        Ok(session)
    }

    /// Append bytes read elsewhere.
    ///
    /// On overflow the buffered input is discarded and the decoder starts
    /// over at the next byte.
    pub fn ingest(&mut self, bytes: &[u8]) -> std::result::Result<(), FrameError> {
        if let Err(err) = self.acc.ingest(bytes) {
            self.decoder.reset();
            return Err(err);
        }
        Ok(())
    }

    /// Decode every complete record buffered so far.
    ///
    /// Each record is applied to the station table and shown to the
    /// handshake before the next one is decoded, so a descriptor or a
    /// dialect change takes effect for the rest of the buffer. Calling it
    /// again after more input continues where it stopped.
    pub fn poll_records(&mut self) -> impl Iterator<Item = Record> + '_ {
        std::iter::from_fn(move || self.next_record())
    }

    fn next_record(&mut self) -> Option<Record> {
        let grammar = self.handshake.dialect().grammar();
        let record = self
            .decoder
            .next_record(&mut self.acc, grammar, &self.stations)?;
        self.decoder.apply(&mut self.stations, &record);
        if let Some(dialect) = self.handshake.observe(&record) {
            debug!(%dialect, "decoder switched grammar");
        }
        if matches!(record, Record::DataReport { .. }) {
            self.poll_answered = true;
        }
        Some(record)
    }

    /// Run the handshake to completion.
    ///
    /// Sleeps `tick_interval` between steps and fails with
    /// [`SessionError::Timeout`] once the total handshake timeout passes.
    pub fn connect(&mut self) -> Result<()> {
        self.ensure_open()?;
        let timeout = self.config.handshake.timeout();
        let tick = self.config.handshake.tick_interval();
        let start = Instant::now();
        info!(family = %self.config.family, ?timeout, "connecting");

        self.handshake.begin(start);
        loop {
            if self.step_handshake(Instant::now())? {
                return Ok(());
            }
            if start.elapsed() >= timeout {
                warn!(state = %self.handshake.state(), "handshake timed out");
                return Err(SessionError::Timeout(timeout));
            }
            std::thread::sleep(tick);
        }
    }

    /// One non-blocking handshake step: read what is available, decode it,
    /// then send whatever the handshake asks for.
    ///
    /// Undecoded input is discarded before any command goes out, so a data
    /// report held for a missing output list cannot block the replies.
    ///
    /// Returns whether the session reached steady state.
    pub fn step_handshake(&mut self, now: Instant) -> Result<bool> {
        self.ensure_open()?;
        if self.handshake.state() == HandshakeState::Disconnected {
            self.handshake.begin(now);
        }

        for _ in 0..MAX_HANDSHAKE_READS {
            let bytes = self.transport.read_nonblocking(self.config.read_chunk)?;
            if bytes.is_empty() {
                break;
            }
            if let Err(err) = self.ingest(&bytes) {
                warn!(error = %err, "handshake input dropped");
            }
            self.poll_records().for_each(drop);
        }

        let commands = self.handshake.tick(now, &self.stations)?;
        if !commands.is_empty() {
            // only replies to what is about to be sent count as answers
            self.discard_input()?;
        }
        for command in &commands {
            self.send(command)?;
        }
        Ok(self.handshake.state() == HandshakeState::SteadyState)
    }

    /// Poll the device once and decode whatever it has sent.
    ///
    /// A new poll goes out when the previous one was answered by a data
    /// report or `poll_interval` has passed. A read that yields nothing is
    /// not an error.
    pub fn poll_cycle(&mut self) -> Result<Vec<Record>> {
        self.ensure_open()?;
        let now = Instant::now();
        let due = match self.last_poll {
            None => true,
            Some(sent) => {
                self.poll_answered
                    || now.saturating_duration_since(sent) >= self.config.poll_interval()
            }
        };
        if due {
            self.send(&Command::Poll)?;
            match self.dialect() {
                Dialect::VendorExtended => self.send(&Command::TrackingStatus)?,
                Dialect::AlternateVendorWireless => self.send(&Command::SignalStrength)?,
                Dialect::GenericTracker | Dialect::AlternateVendor => {}
            }
            self.last_poll = Some(now);
            self.poll_answered = false;
        }

        let bytes = self.transport.read_nonblocking(self.config.read_chunk)?;
        if bytes.is_empty() {
            return Ok(Vec::new());
        }
        if let Err(err) = self.ingest(&bytes) {
            debug!(error = %err, "poll cycle input dropped");
        }
        Ok(self.poll_records().collect())
    }

    /// Encode and write one command for the current dialect's family.
    ///
    /// Commands the family has no spelling for are skipped.
    pub fn send(&mut self, command: &Command) -> Result<()> {
        self.ensure_open()?;
        let family = self.dialect().family();
        let Some(bytes) = command.encode(family) else {
            debug!(command = command.name(), %family, "command not available, skipped");
            return Ok(());
        };
        debug!(command = command.name(), bytes = bytes.len(), "sending command");
        self.transport.write_all(&bytes)?;
        Ok(())
    }

    /// Drop everything received but not yet decoded.
    pub fn discard_input(&mut self) -> Result<()> {
        self.transport.flush_input()?;
        let dropped = self.acc.len();
        self.acc.clear();
        self.decoder.reset();
        if dropped > 0 {
            debug!(dropped, "discarded pending input");
        }
        Ok(())
    }

    /// Return the change flags and clear them.
    pub fn take_changes(&mut self) -> ChangeFlags {
        self.stations.take_changes()
    }

    pub fn stations(&self) -> &StationTable {
        &self.stations
    }

    /// Position of `station` in caller units (`translation_scale` applied).
    pub fn position(&self, station: u8) -> Option<[f32; 3]> {
        self.stations
            .station(station)
            .map(|unit| unit.scaled_position(self.config.translation_scale))
    }

    pub fn stats(&self) -> &DecodeStats {
        self.decoder.stats()
    }

    /// Input buffer overflows so far.
    pub fn overflows(&self) -> u64 {
        self.acc.overflows()
    }

    pub fn dialect(&self) -> Dialect {
        self.handshake.dialect()
    }

    pub fn state(&self) -> HandshakeState {
        self.handshake.state()
    }

    pub fn handshake(&self) -> &HandshakeSession {
        &self.handshake
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Release the transport. Later commands fail with
    /// [`SessionError::Closed`].
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.handshake.close();
        self.transport.close()?;
        info!(
            records = self.decoder.stats().records_decoded,
            malformed = self.decoder.stats().malformed(),
            "session closed"
        );
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        Ok(())
    }
}
