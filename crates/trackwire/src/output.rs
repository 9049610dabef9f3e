use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use trackwire_proto::{
    BeaconUnit, DecodeStats, Dialect, FieldValue, Record, StationTable, StationUnit,
};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    /// Whitespace-separated pose lines, one per data report.
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct RecordOutput<'a> {
    event: &'static str,
    index: usize,
    #[serde(flatten)]
    record: &'a Record,
}

#[derive(Serialize)]
struct StationsOutput<'a> {
    event: &'static str,
    dialect: Dialect,
    translation_scale: f32,
    stations: Vec<&'a StationUnit>,
    beacons: &'a [BeaconUnit],
}

#[derive(Serialize)]
struct StatsOutput<'a> {
    event: &'static str,
    #[serde(flatten)]
    stats: &'a DecodeStats,
    malformed: u64,
    overflows: u64,
}

/// Print records numbered from `first_index`.
pub fn print_records(records: &[Record], first_index: usize, format: OutputFormat) {
    if records.is_empty() {
        return;
    }
    let numbered = records.iter().enumerate().map(|(i, r)| (first_index + i, r));
    match format {
        OutputFormat::Json => {
            for (index, record) in numbered {
                print_json(&RecordOutput {
                    event: "record",
                    index,
                    record,
                });
            }
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["#", "KIND", "STATION", "DETAIL"]);
            for (index, record) in numbered {
                table.add_row(vec![
                    index.to_string(),
                    record.name().to_string(),
                    record.station().map(|s| s.to_string()).unwrap_or_default(),
                    record_detail(record),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for (index, record) in numbered {
                match record.station() {
                    Some(station) => println!(
                        "#{index} {} station={station} {}",
                        record.name(),
                        record_detail(record)
                    ),
                    None => println!("#{index} {} {}", record.name(), record_detail(record)),
                }
            }
        }
        OutputFormat::Raw => {
            let mut out = String::new();
            for (_, record) in numbered {
                if let Record::DataReport { station, fields } = record {
                    out.push_str(&station.to_string());
                    for field in fields {
                        out.push(' ');
                        out.push_str(&field_values(field));
                    }
                    out.push('\n');
                }
            }
            print_raw(out.as_bytes());
        }
    }
}

/// Stations worth listing: reported enabled, given an output list, or
/// seen in a data report.
fn listed_stations(table: &StationTable) -> Vec<&StationUnit> {
    table
        .stations()
        .filter(|s| s.enabled || s.descriptor.is_some() || s.samples > 0)
        .collect()
}

/// Print the known stations (and any beacons) with positions scaled by
/// `scale`.
pub fn print_stations(table: &StationTable, dialect: Dialect, scale: f32, format: OutputFormat) {
    let stations = listed_stations(table);
    match format {
        OutputFormat::Json => print_json(&StationsOutput {
            event: "stations",
            dialect,
            translation_scale: scale,
            stations,
            beacons: table.beacons(),
        }),
        OutputFormat::Table => {
            let mut out = Table::new();
            out.load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec![
                    "STATION",
                    "STATUS",
                    "QUALITY",
                    "POSITION",
                    "ORIENTATION",
                    "BUTTONS",
                    "SAMPLES",
                ]);
            for unit in &stations {
                out.add_row(vec![
                    unit.id.to_string(),
                    unit.tracking_status.as_char().to_string(),
                    unit.quality.to_string(),
                    join_floats(&unit.scaled_position(scale)),
                    join_floats(&unit.orientation),
                    format!("{:#06b}", unit.buttons),
                    unit.samples.to_string(),
                ]);
            }
            println!("{out}");
            if !table.beacons().is_empty() {
                println!("{} beacons configured", table.beacons().len());
            }
        }
        OutputFormat::Pretty => {
            println!("dialect={dialect} stations={}", stations.len());
            for unit in &stations {
                println!(
                    "  station={} status={} pos=[{}] ori=[{}] samples={}",
                    unit.id,
                    unit.tracking_status.as_char(),
                    join_floats(&unit.scaled_position(scale)),
                    join_floats(&unit.orientation),
                    unit.samples
                );
            }
        }
        OutputFormat::Raw => {
            let mut out = String::new();
            for unit in &stations {
                let [x, y, z] = unit.scaled_position(scale);
                let [az, el, roll] = unit.orientation;
                out.push_str(&format!("{} {x} {y} {z} {az} {el} {roll}\n", unit.id));
            }
            print_raw(out.as_bytes());
        }
    }
}

pub fn print_stats(stats: &DecodeStats, overflows: u64, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&StatsOutput {
            event: "stats",
            stats,
            malformed: stats.malformed(),
            overflows,
        }),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["COUNTER", "VALUE"]);
            let rows = [
                ("records decoded", stats.records_decoded),
                ("bad data packets", stats.bad_data_packets),
                ("bad status records", stats.bad_status_records),
                ("bad vendor records", stats.bad_vendor_records),
                ("bad device messages", stats.bad_device_messages),
                ("unknown records", stats.unknown_records),
                ("skipped bytes", stats.skipped_bytes),
                ("unsupported records", stats.unsupported_records),
                ("station out of range", stats.station_out_of_range),
                ("beacon table full", stats.beacon_table_full),
                ("resyncs", stats.resyncs),
                ("buffer overflows", overflows),
            ];
            for (name, value) in rows {
                table.add_row(vec![name.to_string(), value.to_string()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => println!(
            "records={} malformed={} unknown={} skipped_bytes={} resyncs={} overflows={}",
            stats.records_decoded,
            stats.malformed(),
            stats.unknown_records,
            stats.skipped_bytes,
            stats.resyncs,
            overflows
        ),
        // raw output carries poses only
        OutputFormat::Raw => {}
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn print_json<S: Serialize>(value: &S) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn record_detail(record: &Record) -> String {
    match record {
        Record::DataReport { fields, .. } => fields
            .iter()
            .map(|field| format!("{}={}", field_name(field), field_values(field)))
            .collect::<Vec<_>>()
            .join(" "),
        Record::SystemStatus {
            firmware,
            system_id,
            format_flags,
        } => format!(
            "firmware={firmware} system={system_id} binary={}",
            format_flags.binary
        ),
        Record::OutputListDescriptor { descriptor, .. } => format!("{:?}", descriptor.fields()),
        Record::VendorBanner { text, .. }
        | Record::CommandEcho { text }
        | Record::Passthrough { text, .. } => text.trim_end().to_string(),
        Record::ErrorReport { code } => code.clone(),
        Record::Unsupported { reason, .. } => format!("{reason:?}"),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

fn field_name(field: &FieldValue) -> &'static str {
    match field {
        FieldValue::Position(_) => "pos",
        FieldValue::Orientation(_) => "ori",
        FieldValue::XAxisCosines(_) => "xcos",
        FieldValue::YAxisCosines(_) => "ycos",
        FieldValue::ZAxisCosines(_) => "zcos",
        FieldValue::Quaternion(_) => "quat",
        FieldValue::Buttons(_) => "buttons",
        FieldValue::Joystick(_) => "joystick",
        FieldValue::Quality(_) => "quality",
        FieldValue::Timestamp(_) => "time",
        FieldValue::FrameCount(_) => "frame",
    }
}

fn field_values(field: &FieldValue) -> String {
    match field {
        FieldValue::Position(v)
        | FieldValue::Orientation(v)
        | FieldValue::XAxisCosines(v)
        | FieldValue::YAxisCosines(v)
        | FieldValue::ZAxisCosines(v) => join_floats(v),
        FieldValue::Quaternion(v) => join_floats(v),
        FieldValue::Joystick([x, y]) => format!("{x},{y}"),
        FieldValue::Buttons(v) | FieldValue::Timestamp(v) | FieldValue::FrameCount(v) => {
            v.to_string()
        }
        FieldValue::Quality(v) => v.to_string(),
    }
}

fn join_floats(values: &[f32]) -> String {
    values
        .iter()
        .map(|v| format!("{v:.3}"))
        .collect::<Vec<_>>()
        .join(",")
}
