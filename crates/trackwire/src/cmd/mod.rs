use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Subcommand};
use trackwire_proto::{DeviceFamily, Dialect};
use trackwire_session::SessionConfig;

use crate::exit::{io_error, session_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod decode;
#[cfg(unix)]
pub mod monitor;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay a captured byte stream and print what it decodes to.
    Decode(DecodeArgs),
    /// Connect to a tracker on a serial line and poll it.
    Monitor(MonitorArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Decode(args) => decode::run(args, format),
        #[cfg(unix)]
        Command::Monitor(args) => monitor::run(args, format),
        #[cfg(not(unix))]
        Command::Monitor(_) => Err(CliError::new(USAGE, "monitor needs a Unix serial device")),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// File holding raw bytes captured from a tracker.
    pub capture: PathBuf,
    /// Dialect the capture was recorded in.
    #[arg(long, default_value = "generic-tracker")]
    pub dialect: Dialect,
    /// Bytes fed to the decoder per read.
    #[arg(long, default_value = "64")]
    pub chunk: NonZeroUsize,
    /// Session config (JSON) for station limits and scaling.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// Serial device path.
    pub device: PathBuf,
    /// Command set to connect with (standard, alternate). Overrides the config.
    #[arg(long)]
    pub family: Option<DeviceFamily>,
    /// Session config (JSON).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Stop after N poll cycles. Default: until Ctrl-C.
    #[arg(long)]
    pub cycles: Option<u64>,
    /// Pause between poll cycles (e.g. 50ms, 1s).
    #[arg(long, default_value = "50ms")]
    pub interval: String,
    /// Handshake timeout (e.g. 5s, 500ms). Overrides the config.
    #[arg(long)]
    pub timeout: Option<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Read a session config from `path`, or the defaults when there is none.
pub fn load_config(path: Option<&Path>) -> CliResult<SessionConfig> {
    let Some(path) = path else {
        return Ok(SessionConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .map_err(|err| io_error(&format!("read config {}", path.display()), err))?;
    SessionConfig::from_json(&text).map_err(|err| session_error("invalid config", err))
}

/// Parse `150ms`, `5s` or a bare number of seconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
