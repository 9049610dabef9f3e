use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::info;
use trackwire_session::Session;
use trackwire_transport::SerialLine;

use crate::cmd::{load_config, parse_duration, MonitorArgs};
use crate::exit::{session_error, transport_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_records, print_stations, print_stats, OutputFormat};

pub fn run(args: MonitorArgs, format: OutputFormat) -> CliResult<i32> {
    let interval = parse_duration(&args.interval)?;
    let mut config = load_config(args.config.as_deref())?;
    if let Some(family) = args.family {
        config.family = family;
    }
    if let Some(timeout) = &args.timeout {
        let timeout = parse_duration(timeout)?;
        config.handshake.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
    }

    let line =
        SerialLine::open(&args.device).map_err(|err| transport_error("open failed", err))?;
    let mut session =
        Session::new(line, config).map_err(|err| session_error("invalid config", err))?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    session
        .connect()
        .map_err(|err| session_error("connect failed", err))?;
    info!(
        dialect = %session.dialect(),
        stations = ?session.stations().enabled_stations(),
        "monitoring"
    );

    let scale = session.config().translation_scale;
    let mut cycles = 0u64;
    let mut printed = 0usize;
    while running.load(Ordering::SeqCst) && args.cycles.is_none_or(|limit| cycles < limit) {
        let records = session
            .poll_cycle()
            .map_err(|err| session_error("poll failed", err))?;
        cycles += 1;

        if matches!(format, OutputFormat::Raw) {
            print_records(&records, printed, format);
        } else if session.take_changes().any() {
            print_stations(session.stations(), session.dialect(), scale, format);
        }
        printed += records.len();
        std::thread::sleep(interval);
    }

    let stats = *session.stats();
    let overflows = session.overflows();
    session
        .close()
        .map_err(|err| session_error("close failed", err))?;
    info!(cycles, records = printed, "monitor stopped");
    print_stats(&stats, overflows, format);
    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
