#![cfg(feature = "cli")]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const OUTPUT_LIST: &[u8] = b"21O 2 4 1\r\n";
const POSE: &[u8] = b"01   12.00  -3.50   0.25  10.00   0.00  -5.00\r\n";

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "trackwire-cli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn write_capture(dir: &Path, parts: &[&[u8]]) -> PathBuf {
    let path = dir.join("capture.bin");
    std::fs::write(&path, parts.concat()).expect("capture should be writable");
    path
}

fn trackwire(args: &[&str], capture: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_trackwire"))
        .args(["--log-level", "error"])
        .args(args)
        .arg(capture)
        .output()
        .expect("trackwire should run")
}

#[test]
fn decode_prints_records_stations_and_stats() {
    let dir = unique_temp_dir("decode");
    let capture = write_capture(&dir, &[OUTPUT_LIST, POSE, POSE]);

    let output = trackwire(&["--format", "json", "decode"], &capture);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line should be JSON"))
        .collect();

    assert_eq!(lines.len(), 5, "3 records, stations, stats: {stdout}");
    assert_eq!(lines[0]["kind"], "output_list_descriptor");
    assert_eq!(lines[1]["kind"], "data_report");
    assert_eq!(lines[2]["index"], 2);

    let stations = &lines[3];
    assert_eq!(stations["event"], "stations");
    assert_eq!(stations["dialect"], "generic-tracker");
    assert_eq!(stations["stations"][0]["id"], 1);
    assert_eq!(stations["stations"][0]["samples"], 2);

    let stats = &lines[4];
    assert_eq!(stats["event"], "stats");
    assert_eq!(stats["records_decoded"], 3);
    assert_eq!(stats["malformed"], 0);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn chunk_size_does_not_change_output() {
    let dir = unique_temp_dir("chunks");
    let capture = write_capture(&dir, &[OUTPUT_LIST, POSE, POSE, POSE]);

    let whole = trackwire(&["--format", "json", "decode", "--chunk", "4096"], &capture);
    let bytewise = trackwire(&["--format", "json", "decode", "--chunk", "1"], &capture);
    assert!(whole.status.success() && bytewise.status.success());
    assert_eq!(whole.stdout, bytewise.stdout);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn garbage_in_capture_is_skipped() {
    let dir = unique_temp_dir("garbage");
    let capture = write_capture(&dir, &[OUTPUT_LIST, b"zz", POSE]);

    let output = trackwire(&["--format", "json", "decode"], &capture);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.matches("\"kind\":\"data_report\"").count(), 1);
    assert!(stdout.contains("\"unknown_records\":1"), "{stdout}");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn raw_format_prints_pose_lines() {
    let dir = unique_temp_dir("raw");
    let capture = write_capture(&dir, &[OUTPUT_LIST, POSE]);

    let output = trackwire(&["--format", "raw", "decode"], &capture);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.starts_with("1 12.000,-3.500,0.250 10.000,0.000,-5.000\n"),
        "{stdout}"
    );

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn alternate_capture_decodes_with_dialect_flag() {
    let dir = unique_temp_dir("alternate");
    let capture = write_capture(
        &dir,
        &[
            b"01O   2  4  1 \r\n",
            b"01     1.0000   2.0000   3.0000   0.0000   0.0000   0.0000\r\n",
        ],
    );

    let output = trackwire(
        &["--format", "json", "decode", "--dialect", "alternate-vendor"],
        &capture,
    );
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"dialect\":\"alternate-vendor\""));
    assert_eq!(stdout.matches("\"kind\":\"data_report\"").count(), 1);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn missing_capture_returns_64() {
    let missing = std::env::temp_dir().join(format!(
        "trackwire-missing-{}.bin",
        std::process::id()
    ));
    let output = trackwire(&["decode"], &missing);
    assert_eq!(output.status.code(), Some(64));
    assert!(String::from_utf8_lossy(&output.stderr).starts_with("error: read "));
}

#[test]
fn invalid_config_returns_64() {
    let dir = unique_temp_dir("config");
    let capture = write_capture(&dir, &[OUTPUT_LIST, POSE]);
    let config = dir.join("config.json");
    std::fs::write(&config, r#"{ "read_chunk": 0 }"#).expect("config should be writable");

    let output = Command::new(env!("CARGO_BIN_EXE_trackwire"))
        .arg("decode")
        .arg(&capture)
        .arg("--config")
        .arg(&config)
        .output()
        .expect("trackwire should run");
    assert_eq!(output.status.code(), Some(64));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn version_reports_package_version() {
    let output = Command::new(env!("CARGO_BIN_EXE_trackwire"))
        .arg("version")
        .output()
        .expect("version should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), format!("trackwire {}", env!("CARGO_PKG_VERSION")));
}
