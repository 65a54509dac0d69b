//! Plan output: one row per (tick, satellite) plus a run summary

use crate::arbitration::{Decision, Gate, TaskAction};
use crate::scenario::Satellite;
use crate::{round_to, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Column order of the CSV plan
pub const CSV_HEADER: [&str; 10] = [
    "timestamp",
    "satellite",
    "action",
    "in_sunlight",
    "over_target",
    "over_ground",
    "energy_wh",
    "battery_pct",
    "data_mb",
    "storage_pct",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRow {
    pub timestamp: DateTime<Utc>,
    pub satellite: String,
    /// `idle`, `image:<target>` or `downlink`
    pub action: String,
    pub in_sunlight: bool,
    pub over_target: bool,
    pub over_ground: bool,
    pub energy_wh: f64,
    pub battery_pct: f64,
    pub data_mb: f64,
    pub storage_pct: f64,
}

impl OutputRow {
    /// Snapshot of `satellite` after its action for the tick was committed
    pub fn capture(
        timestamp: DateTime<Utc>,
        satellite: &Satellite,
        action: &TaskAction,
        in_sunlight: bool,
        over_target: bool,
        over_ground: bool,
    ) -> Self {
        Self {
            timestamp,
            satellite: satellite.id.clone(),
            action: action.to_string(),
            in_sunlight,
            over_target,
            over_ground,
            energy_wh: round_to(satellite.energy.level_wh(), 2),
            battery_pct: round_to(satellite.energy.state_of_charge(), 1),
            data_mb: round_to(satellite.data.stored_mb(), 2),
            storage_pct: round_to(satellite.data.fill_level(), 1),
        }
    }
}

/// Per-satellite counters over a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SatelliteSummary {
    pub images: u64,
    pub downlinks: u64,
    pub idles: u64,
    pub downlinked_mb: f64,
    pub rejections: BTreeMap<Gate, u64>,
    pub final_energy_wh: f64,
    pub final_data_mb: f64,
}

impl SatelliteSummary {
    pub fn record(&mut self, decision: &Decision) {
        match decision.action {
            TaskAction::Image(_) => self.images += 1,
            TaskAction::Downlink => self.downlinks += 1,
            TaskAction::Idle => self.idles += 1,
        }
        self.downlinked_mb += decision.downlinked_mb;
        if let Some(rejection) = &decision.rejection {
            *self.rejections.entry(rejection.gate).or_insert(0) += 1;
        }
    }

    pub fn total_rejections(&self) -> u64 {
        self.rejections.values().sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub ticks: u64,
    pub rows: usize,
    pub start_time: DateTime<Utc>,
    pub generated_at: DateTime<Utc>,
    /// Keyed by satellite id
    pub satellites: BTreeMap<String, SatelliteSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub summary: RunSummary,
    pub rows: Vec<OutputRow>,
}

impl RunReport {
    pub fn log_summary(&self) {
        info!(
            "Run complete: {} ticks, {} rows from {}",
            self.summary.ticks, self.summary.rows, self.summary.start_time
        );
        for (id, s) in &self.summary.satellites {
            info!(
                "  {:12} | images {:4} | downlinks {:4} | idle {:4} | {:8.1} MB down | \
                 {:3} rejected | {:6.2} Wh left",
                id,
                s.images,
                s.downlinks,
                s.idles,
                s.downlinked_mb,
                s.total_rejections(),
                s.final_energy_wh
            );
        }
    }
}

/// Header plus one record per row, even when `rows` is empty
pub fn write_csv<W: Write>(rows: &[OutputRow], writer: W) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv_writer.write_record(CSV_HEADER)?;
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Full record dump as pretty JSON
pub fn write_json<W: Write>(report: &RunReport, writer: W) -> Result<()> {
    serde_json::to_writer_pretty(writer, report)?;
    Ok(())
}

pub fn save_csv(rows: &[OutputRow], path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    info!("Writing plan CSV to {:?}", path);
    let file = create_with_parents(path)?;
    write_csv(rows, BufWriter::new(file))
}

pub fn save_json(report: &RunReport, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    info!("Writing plan JSON to {:?}", path);
    let file = create_with_parents(path)?;
    let mut writer = BufWriter::new(file);
    write_json(report, &mut writer)?;
    writer.flush()?;
    Ok(())
}

fn create_with_parents(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(File::create(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbitration::Rejection;
    use crate::data::DataState;
    use crate::testing::{satellite, t0};

    fn sample_rows() -> Vec<OutputRow> {
        let mut sat = satellite("SAT-1");
        sat.data = DataState::new(300.0, 100.0, 10.0);
        vec![
            OutputRow::capture(t0(), &sat, &TaskAction::Image("Paris".into()), true, true, false),
            OutputRow::capture(t0(), &sat, &TaskAction::Downlink, false, false, true),
        ]
    }

    fn sample_report() -> RunReport {
        let rows = sample_rows();
        RunReport {
            summary: RunSummary {
                ticks: 1,
                rows: rows.len(),
                start_time: t0(),
                generated_at: t0(),
                satellites: BTreeMap::new(),
            },
            rows,
        }
    }

    #[test]
    fn test_capture_rounds() {
        let mut sat = satellite("SAT-1");
        sat.data = DataState::new(300.0, 100.0, 10.0);
        let row = OutputRow::capture(t0(), &sat, &TaskAction::Idle, false, false, false);
        assert_eq!(row.action, "idle");
        assert_eq!(row.energy_wh, 100.0);
        assert_eq!(row.battery_pct, 100.0);
        assert_eq!(row.data_mb, 100.0);
        assert_eq!(row.storage_pct, 33.3);
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = SatelliteSummary::default();
        summary.record(&Decision {
            action: TaskAction::Downlink,
            downlinked_mb: 75.0,
            rejection: None,
        });
        summary.record(&Decision {
            action: TaskAction::Idle,
            downlinked_mb: 0.0,
            rejection: Some(Rejection {
                satellite: "SAT-1".into(),
                tick: 3,
                candidate: Some("Paris".into()),
                gate: Gate::Lookahead,
            }),
        });
        assert_eq!(summary.downlinks, 1);
        assert_eq!(summary.idles, 1);
        assert_eq!(summary.downlinked_mb, 75.0);
        assert_eq!(summary.rejections.get(&Gate::Lookahead), Some(&1));
        assert_eq!(summary.total_rejections(), 1);
    }

    #[test]
    fn test_csv_header_and_rows() {
        let mut buf = Vec::new();
        write_csv(&sample_rows(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();

        assert_eq!(lines.next().unwrap(), CSV_HEADER.join(","));
        let first = lines.next().unwrap();
        assert!(first.starts_with("2025-06-01T00:00:00Z,SAT-1,image:Paris,true,true,false,"));
        assert!(lines.next().unwrap().contains(",downlink,"));
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_csv_empty_still_has_header() {
        let mut buf = Vec::new();
        write_csv(&[], &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap().trim_end(), CSV_HEADER.join(","));
    }

    #[test]
    fn test_csv_reads_back() {
        let mut buf = Vec::new();
        let rows = sample_rows();
        write_csv(&rows, &mut buf).unwrap();

        let mut reader = csv::Reader::from_reader(buf.as_slice());
        let parsed: Vec<OutputRow> = reader
            .deserialize()
            .collect::<std::result::Result<_, _>>()
            .unwrap();
        assert_eq!(parsed, rows);
    }

    #[test]
    fn test_save_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("outputs/nested/plan.csv");
        let json_path = csv_path.with_extension("json");
        let report = sample_report();

        save_csv(&report.rows, &csv_path).unwrap();
        save_json(&report, &json_path).unwrap();

        assert!(csv_path.exists());
        let text = fs::read_to_string(&json_path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["rows"][0]["action"], "image:Paris");
        assert_eq!(value["summary"]["ticks"], 1);
    }
}
