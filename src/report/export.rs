//! CSV export of the metrics tables.

use crate::error::AnalyticsResult;
use crate::models::{DistanceBin, MetricsSummary};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const SUMMARY_FILE: &str = "wspr_summary.csv";
pub const HOURLY_FILE: &str = "wspr_hourly.csv";
pub const CALL_SIGNS_FILE: &str = "wspr_callsigns.csv";
pub const DISTANCES_FILE: &str = "wspr_distances.csv";
pub const REPORTERS_FILE: &str = "wspr_reporters.csv";
pub const COUNTRIES_FILE: &str = "wspr_countries.csv";
pub const BINS_FILE: &str = "wspr_bins.csv";
pub const LOG_BINS_FILE: &str = "wspr_log_bins.csv";

#[derive(Serialize)]
struct SummaryRow<'a> {
    metric: &'a str,
    value: usize,
}

#[derive(Serialize)]
struct BinRow {
    label: String,
    lower_km: f64,
    upper_km: Option<f64>,
    spots: usize,
}

impl From<&DistanceBin> for BinRow {
    fn from(bin: &DistanceBin) -> Self {
        Self {
            label: bin.label(),
            lower_km: bin.lower_km,
            upper_km: bin.upper_km,
            spots: bin.spots,
        }
    }
}

/// Write one CSV per metrics table into `dir`.
///
/// Returns the files written, in a fixed order.
pub fn export_tables(summary: &MetricsSummary, dir: &Path) -> AnalyticsResult<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let counts = &summary.counts;

    let summary_rows = [
        ("total_rows", counts.total_rows),
        ("valid_rows", counts.valid_rows),
        ("skipped_rows", counts.skipped_rows),
        ("unique_spots", counts.unique_spots),
        ("unique_reporters", counts.unique_reporters),
        ("unique_grids", counts.unique_grids),
        ("unique_grids_4", counts.unique_grids_4),
    ]
    .map(|(metric, value)| SummaryRow { metric, value });

    let written = vec![
        write_table(&dir.join(SUMMARY_FILE), summary_rows)?,
        write_table(&dir.join(HOURLY_FILE), &summary.hourly)?,
        write_table(&dir.join(CALL_SIGNS_FILE), &summary.top_call_signs)?,
        write_table(&dir.join(DISTANCES_FILE), &summary.furthest)?,
        write_table(&dir.join(REPORTERS_FILE), &summary.furthest_by_reporter)?,
        write_table(&dir.join(COUNTRIES_FILE), &summary.countries)?,
        write_table(
            &dir.join(BINS_FILE),
            summary.distance_bins.iter().map(BinRow::from),
        )?,
        write_table(
            &dir.join(LOG_BINS_FILE),
            summary.log_distance_bins.iter().map(BinRow::from),
        )?,
    ];

    Ok(written)
}

fn write_table<I>(path: &Path, rows: I) -> AnalyticsResult<PathBuf>
where
    I: IntoIterator,
    I::Item: Serialize,
{
    let mut writer = csv::Writer::from_path(path)?;
    let mut count = 0usize;
    for row in rows {
        writer.serialize(row)?;
        count += 1;
    }
    writer.flush()?;

    debug!("Exported {} rows to {}", count, path.display());
    Ok(path.to_path_buf())
}
