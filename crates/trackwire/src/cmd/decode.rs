use tracing::{info, warn};
use trackwire_session::Session;
use trackwire_transport::MemoryTransport;

use crate::cmd::{load_config, DecodeArgs};
use crate::exit::{io_error, session_error, CliResult, SUCCESS};
use crate::output::{print_records, print_stations, print_stats, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let capture = std::fs::read(&args.capture)
        .map_err(|err| io_error(&format!("read {}", args.capture.display()), err))?;

    let mut config = load_config(args.config.as_deref())?;
    config.family = args.dialect.family();
    let scale = config.translation_scale;

    // the capture is fed in directly; the transport only absorbs commands
    let mut session = Session::established(MemoryTransport::new(), config, args.dialect)
        .map_err(|err| session_error("session setup failed", err))?;

    let mut records = Vec::new();
    for chunk in capture.chunks(args.chunk.get()) {
        if let Err(err) = session.ingest(chunk) {
            warn!(error = %err, "capture chunk dropped");
        }
        records.extend(session.poll_records());
    }
    info!(
        bytes = capture.len(),
        records = records.len(),
        dialect = %session.dialect(),
        "capture decoded"
    );

    print_records(&records, 0, format);
    print_stations(session.stations(), session.dialect(), scale, format);
    print_stats(session.stats(), session.overflows(), format);
    Ok(SUCCESS)
}
