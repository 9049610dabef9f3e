use trackwire_proto::{DeviceFamily, Dialect, FieldType, TrackingStatus};
use trackwire_session::{HandshakeConfig, HandshakeState, Session, SessionConfig, SessionError};
use trackwire_transport::MemoryTransport;

fn fast(family: DeviceFamily, max_attempts: u32) -> SessionConfig {
    SessionConfig {
        handshake: HandshakeConfig {
            response_timeout_ms: 5,
            max_attempts,
            timeout_ms: 2_000,
            tick_interval_ms: 1,
        },
        ..SessionConfig::for_family(family)
    }
}

fn system_status(system_id: &str) -> Vec<u8> {
    let mut rec = b"21S  0".to_vec();
    rec.resize(15, b' ');
    rec.extend_from_slice(format!("3.0 {system_id}").as_bytes());
    rec.resize(53, b' ');
    rec.extend_from_slice(b"\r\n");
    rec
}

fn all_states(enabled: &str) -> Vec<u8> {
    let mut rec = format!("21l{enabled}").into_bytes();
    rec.resize(35, b'0');
    rec.extend_from_slice(b"\r\n");
    rec
}

fn version_banner(model: &str, len: usize) -> Vec<u8> {
    let mut rec = b"00v".to_vec();
    rec.resize(24, b' ');
    rec.extend_from_slice(model.as_bytes());
    rec.resize(len - 2, b' ');
    rec.extend_from_slice(b"\r\n");
    rec
}

fn alternate_pose(station: u8, values: [f32; 6]) -> Vec<u8> {
    let mut rec = format!("0{station}  ").into_bytes();
    for v in values {
        rec.extend_from_slice(format!("{v:>9.4}").as_bytes());
    }
    rec.extend_from_slice(b"\r\n");
    rec
}

fn weak_signal_report() -> Vec<u8> {
    let mut rec = String::from("00@S");
    for _ in 0..4 {
        rec.push_str(&format!(" {:>9.6}", 0.00005));
    }
    rec.push_str("  \r\n");
    for _ in 0..2 {
        rec.push_str("     ");
        rec.push_str(&" 0.000000 ".repeat(4)[..40]);
        rec.push_str("\r\n");
    }
    rec.push_str("     \r\n");
    rec.into_bytes()
}

fn written(session: &Session<MemoryTransport>) -> String {
    String::from_utf8_lossy(session.transport().written()).into_owned()
}

#[test]
fn generic_device_connects_and_installs_output_lists() {
    let mut device = MemoryTransport::new();
    device
        .respond_to("S", system_status("fastrak"))
        .respond_to("l*\n", all_states("11"))
        .respond_to("O1\r", "21O 2 4 1\r\n")
        .respond_to("O2\r", "22O 2 4 1\r\n");

    let mut session = Session::new(device, fast(DeviceFamily::Standard, 3)).unwrap();
    session.connect().unwrap();

    assert_eq!(session.state(), HandshakeState::SteadyState);
    assert_eq!(session.dialect(), Dialect::GenericTracker);
    assert_eq!(session.stations().enabled_stations(), vec![1, 2]);
    for id in [1, 2] {
        let descriptor = session.stations().descriptor(id).unwrap();
        assert_eq!(
            descriptor.fields(),
            &[FieldType::Position, FieldType::Orientation, FieldType::Crlf]
        );
    }
    let sent = written(&session);
    assert!(sent.starts_with("cFUS"));
    assert!(sent.contains("O1,2,4,1\n\rH1,0,0,1\rO1\r"));
    assert!(sent.contains("O2,2,4,1\n\rH2,0,0,1\rO2\r"));
    assert_eq!(session.handshake().retries(), 0);
}

#[test]
fn vendor_device_requests_quality_and_tracking_status() {
    let mut device = MemoryTransport::new();
    device
        .respond_to("S", system_status("IS900 SimTrack"))
        .respond_to("l*\n", all_states("1"))
        .respond_to("O1\r", "21O40 2 4 1\r\n");

    let mut session = Session::new(device, fast(DeviceFamily::Standard, 3)).unwrap();
    session.connect().unwrap();
    assert_eq!(session.dialect(), Dialect::VendorExtended);
    let sent = written(&session);
    assert!(sent.contains("MCF\nMP\n"));
    assert!(sent.contains("O1,40,2,4,1\n\r"));

    session.transport_mut().take_written();
    session.transport_mut().respond_to(
        "P",
        "01    3  12.00  -3.50   0.25  10.00   0.00  -5.00\r\n",
    );
    let records = session.poll_cycle().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(written(&session), "PMP\n");
    let unit = session.stations().station(1).unwrap();
    assert_eq!(unit.quality, 3);
    assert_eq!(unit.position, [12.0, -3.5, 0.25]);
}

#[test]
fn unanswered_queries_are_resent() {
    let mut device = MemoryTransport::new();
    device
        .respond_after("S", 2, system_status("fastrak"))
        .respond_to("l*\n", all_states("1"))
        .respond_to("O1\r", "21O 2 4 1\r\n");

    let mut session = Session::new(device, fast(DeviceFamily::Standard, 3)).unwrap();
    session.connect().unwrap();

    assert_eq!(session.handshake().retries(), 2);
    assert_eq!(written(&session).matches('S').count(), 3);
}

#[test]
fn silent_device_exhausts_attempts() {
    let mut session =
        Session::new(MemoryTransport::new(), fast(DeviceFamily::Standard, 3)).unwrap();
    let err = session.connect().unwrap_err();
    assert!(
        matches!(
            err,
            SessionError::HandshakeFailed {
                state: HandshakeState::Identifying,
                attempts: 3
            }
        ),
        "{err}"
    );
}

#[test]
fn total_timeout_bounds_connect() {
    let mut config = fast(DeviceFamily::Alternate, 1_000);
    config.handshake.timeout_ms = 30;
    let mut session = Session::new(MemoryTransport::new(), config).unwrap();

    let err = session.connect().unwrap_err();
    assert!(matches!(err, SessionError::Timeout(t) if t.as_millis() == 30));
}

#[test]
fn discovery_stalls_without_unit_states() {
    let mut device = MemoryTransport::new();
    device.respond_to("\x16\r", version_banner("Patriot ", 128));

    let mut session = Session::new(device, fast(DeviceFamily::Alternate, 2)).unwrap();
    let err = session.connect().unwrap_err();
    assert!(matches!(
        err,
        SessionError::HandshakeFailed {
            state: HandshakeState::StationDiscovery,
            attempts: 2
        }
    ));
    assert_eq!(session.dialect(), Dialect::AlternateVendor);
}

#[test]
fn wired_alternate_device_connects() {
    let mut device = MemoryTransport::new();
    device
        .respond_to("\x16\r", version_banner("Patriot ", 128))
        .respond_to("\x151\r", "00u  01\r\n")
        .respond_to("O1\r", "01O   2  4  1 \r\n");

    let mut session = Session::new(device, fast(DeviceFamily::Alternate, 3)).unwrap();
    session.connect().unwrap();

    assert_eq!(session.dialect(), Dialect::AlternateVendor);
    assert_eq!(session.stations().enabled_stations(), vec![1]);
    let sent = written(&session);
    assert!(sent.starts_with("\x050\rpF0\rU0\r\x16\r"));
    assert!(!sent.contains('P'), "no poll before steady state");
    assert!(sent.contains("O1,2,4,1\rH1,0,0,1\rO1\r"));
}

#[test]
fn wireless_device_connects_and_polls_signal_strength() {
    let mut device = MemoryTransport::new();
    device
        .respond_to("\x16\r", version_banner("Wireless", 137))
        .respond_to("\x151\r", "00u  0011\r\n")
        .respond_to("O1\r", "01O   2  4  1 \r\n")
        .respond_to("O2\r", "02O   2  4  1 \r\n");

    let mut session = Session::new(device, fast(DeviceFamily::Alternate, 3)).unwrap();
    session.connect().unwrap();

    assert_eq!(session.dialect(), Dialect::AlternateVendorWireless);
    assert_eq!(session.stations().enabled_stations(), vec![1, 2]);
    let sent = written(&session);
    assert!(sent.contains("@A1\r\x151\r"));
    assert!(!sent.contains("O1,"), "wireless units keep their output list");

    let mut poses = alternate_pose(1, [1.0, 2.0, 3.0, 0.0, 0.0, 0.0]);
    poses.extend(alternate_pose(2, [4.0, 5.0, 6.0, 0.0, 0.0, 0.0]));
    session
        .transport_mut()
        .respond_to("P", poses)
        .respond_to("@S\r", weak_signal_report());

    // one read per cycle: the poses first, the signal report next
    let first = session.poll_cycle().unwrap();
    assert_eq!(first.len(), 2);
    let second = session.poll_cycle().unwrap();
    assert_eq!(second.len(), 1);

    for id in 1..=2 {
        let unit = session.stations().station(id).unwrap();
        assert_eq!(unit.tracking_status, TrackingStatus::NoSignal);
        assert_eq!(unit.samples, 1);
    }
    assert_eq!(session.stats().malformed(), 0);
}

fn streaming_alternate_device(banner: Vec<u8>, states: &str) -> MemoryTransport {
    let mut device = MemoryTransport::new();
    device
        .respond_to("\x16\r", banner)
        .respond_to("\x151\r", states)
        .respond_to("O1\r", "01O   2  4  1 \r\n")
        .respond_to("O2\r", "02O   2  4  1 \r\n")
        .respond_to("P", alternate_pose(1, [1.0, 2.0, 3.0, 0.0, 0.0, 0.0]));
    // left over from before the session was opened
    device.push_inbound(alternate_pose(1, [9.0, 9.0, 9.0, 0.0, 0.0, 0.0]));
    device
}

#[test]
fn wired_device_answering_polls_connects_first_try() {
    let device = streaming_alternate_device(version_banner("Patriot ", 128), "00u  01\r\n");
    let mut session = Session::new(device, fast(DeviceFamily::Alternate, 1)).unwrap();
    session.connect().unwrap();

    assert_eq!(session.dialect(), Dialect::AlternateVendor);
    assert_eq!(session.handshake().retries(), 0);
    assert!(session.stations().descriptor(1).is_some());

    let records = session.poll_cycle().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(session.stations().station(1).unwrap().position, [1.0, 2.0, 3.0]);
}

#[test]
fn wireless_device_answering_polls_connects_first_try() {
    let device = streaming_alternate_device(version_banner("Wireless", 137), "00u  0011\r\n");
    let mut session = Session::new(device, fast(DeviceFamily::Alternate, 1)).unwrap();
    session.connect().unwrap();

    assert_eq!(session.dialect(), Dialect::AlternateVendorWireless);
    assert_eq!(session.handshake().retries(), 0);
    assert_eq!(session.stations().enabled_stations(), vec![1, 2]);
    assert_eq!(session.stats().malformed(), 0);
}

#[test]
fn startup_banner_selects_alternate_dialect() {
    fn dialect_after(banner: &[u8]) -> Dialect {
        let config = SessionConfig::for_family(DeviceFamily::Alternate);
        let mut session = Session::new(MemoryTransport::new(), config).unwrap();
        session.ingest(banner).unwrap();
        session.poll_records().for_each(drop);
        session.dialect()
    }

    assert_eq!(
        dialect_after(b"Patriot Wireless Ready!\r\n"),
        Dialect::AlternateVendorWireless
    );
    assert_eq!(dialect_after(b"Patriot Ready!\r\n"), Dialect::AlternateVendor);
}

#[test]
fn wireless_banner_switches_grammar_mid_buffer() {
    let config = SessionConfig::for_family(DeviceFamily::Alternate);
    let mut session = Session::new(MemoryTransport::new(), config).unwrap();
    session
        .ingest(b"Patriot Wireless Ready!\r\n00u  1111\r\n")
        .unwrap();

    let records: Vec<_> = session.poll_records().collect();
    assert_eq!(records.len(), 2);
    assert_eq!(session.stations().enabled_stations(), vec![1, 2, 3, 4]);
}
