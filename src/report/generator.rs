//! Markdown and JSON report generation.
//!
//! This module renders an [`AnalysisReport`] as a Markdown document with
//! one table per metric, or as pretty-printed JSON.

use crate::models::{
    AnalysisReport, CallSignCount, CountryCount, DistanceBin, FurthestSpot, HourlyDistance,
    ReportMetadata, StationReach, SummaryCounts,
};
use anyhow::Result;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &AnalysisReport) -> String {
    let metrics = &report.metrics;
    let mut output = String::new();

    // Title
    if report.metadata.call_sign.is_empty() {
        output.push_str("# WSPR Analytics Report\n\n");
    } else {
        output.push_str(&format!(
            "# WSPR Analytics Report: {}\n\n",
            report.metadata.call_sign
        ));
    }

    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_summary_section(&metrics.counts));
    output.push_str(&generate_hourly_section(&metrics.hourly));
    output.push_str(&generate_call_sign_section(&metrics.top_call_signs));
    output.push_str(&generate_furthest_section(&metrics.furthest));
    output.push_str(&generate_reach_section(&metrics.furthest_by_reporter));
    output.push_str(&generate_country_section(&metrics.countries));
    output.push_str(&generate_bins_section(
        "Distance Distribution",
        &metrics.distance_bins,
    ));
    output.push_str(&generate_bins_section(
        "Logarithmic Distance Distribution",
        &metrics.log_distance_bins,
    ));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    if !metadata.call_sign.is_empty() {
        section.push_str(&format!("- **Call Sign:** {}\n", metadata.call_sign));
    }
    if let (Some(start), Some(end)) = (metadata.window_start, metadata.window_end) {
        section.push_str(&format!(
            "- **Requested Window:** {} to {}\n",
            start.format(TIME_FORMAT),
            end.format(TIME_FORMAT)
        ));
    }
    if let (Some(first), Some(last)) = (metadata.first_spot, metadata.last_spot) {
        section.push_str(&format!(
            "- **Spots Between:** {} and {}\n",
            first.format(TIME_FORMAT),
            last.format(TIME_FORMAT)
        ));
    }
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format(TIME_FORMAT)
    ));
    section.push_str(&format!("- **Data File:** `{}`\n", metadata.data_file));
    section.push('\n');

    section
}

/// Generate the summary counts section.
fn generate_summary_section(counts: &SummaryCounts) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str("| Metric | Value |\n");
    section.push_str("|:---|---:|\n");
    for (name, value) in [
        ("Total rows", counts.total_rows),
        ("Valid spots", counts.valid_rows),
        ("Unique spots", counts.unique_spots),
        ("Unique reporters", counts.unique_reporters),
        ("Unique grid squares", counts.unique_grids),
        ("Unique 4-character grids", counts.unique_grids_4),
    ] {
        section.push_str(&format!("| {} | {} |\n", name, value));
    }
    section.push('\n');

    if counts.skipped_rows > 0 {
        section.push_str(&format!(
            "> **Note:** {} malformed rows were skipped and are not included in any metric.\n\n",
            counts.skipped_rows
        ));
    }

    section
}

/// Generate the per-hour distance table.
fn generate_hourly_section(hourly: &[HourlyDistance]) -> String {
    let mut section = String::new();

    section.push_str("## Hourly Distance\n\n");
    section.push_str("| Hour (UTC) | Spots | Mean (km) | Min (km) | Max (km) |\n");
    section.push_str("|:---:|---:|---:|---:|---:|\n");
    for hour in hourly {
        section.push_str(&format!(
            "| {:02}:00 | {} | {:.0} | {:.0} | {:.0} |\n",
            hour.hour, hour.spots, hour.mean_km, hour.min_km, hour.max_km
        ));
    }
    section.push('\n');

    section
}

/// Generate the top call signs table.
fn generate_call_sign_section(calls: &[CallSignCount]) -> String {
    let mut section = String::new();

    section.push_str("## Top Call Signs\n\n");
    section.push_str("| # | Call Sign | Grid | Spots |\n");
    section.push_str("|---:|:---|:---|---:|\n");
    for (i, call) in calls.iter().enumerate() {
        section.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            i + 1,
            call.call_sign,
            dash_if_empty(&call.grid),
            call.count
        ));
    }
    section.push('\n');

    section
}

/// Generate the furthest spots table.
fn generate_furthest_section(furthest: &[FurthestSpot]) -> String {
    let mut section = String::new();

    section.push_str("## Furthest Spots\n\n");
    section.push_str("| # | Time (UTC) | Reporter | Grid | Transmitter | Grid | Distance (km) | SNR (dB) |\n");
    section.push_str("|---:|:---|:---|:---|:---|:---|---:|---:|\n");
    for (i, spot) in furthest.iter().enumerate() {
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {:.0} | {:.0} |\n",
            i + 1,
            spot.timestamp.format("%Y-%m-%d %H:%M"),
            spot.reporter_call,
            dash_if_empty(&spot.reporter_grid),
            spot.transmitter_call,
            dash_if_empty(&spot.transmitter_grid),
            spot.distance_km,
            spot.snr
        ));
    }
    section.push('\n');

    section
}

/// Generate the furthest-per-reporter table.
fn generate_reach_section(reach: &[StationReach]) -> String {
    let mut section = String::new();

    section.push_str("## Furthest Reporters\n\n");
    section.push_str("| # | Reporter | Grid | Furthest (km) | Spots |\n");
    section.push_str("|---:|:---|:---|---:|---:|\n");
    for (i, station) in reach.iter().enumerate() {
        section.push_str(&format!(
            "| {} | {} | {} | {:.0} | {} |\n",
            i + 1,
            station.call_sign,
            dash_if_empty(&station.grid),
            station.distance_km,
            station.spots
        ));
    }
    section.push('\n');

    section
}

/// Generate the spots-by-country table.
fn generate_country_section(countries: &[CountryCount]) -> String {
    let mut section = String::new();

    section.push_str("## Spots by Country\n\n");
    section.push_str("| Country | Spots |\n");
    section.push_str("|:---|---:|\n");
    for country in countries {
        section.push_str(&format!("| {} | {} |\n", country.country, country.spots));
    }
    section.push('\n');

    section
}

/// Generate a histogram table.
fn generate_bins_section(title: &str, bins: &[DistanceBin]) -> String {
    let mut section = String::new();

    section.push_str(&format!("## {}\n\n", title));
    section.push_str("| Distance | Spots |\n");
    section.push_str("|:---|---:|\n");
    for bin in bins {
        section.push_str(&format!("| {} | {} |\n", bin.label(), bin.spots));
    }
    section.push('\n');

    section
}

fn dash_if_empty(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Report generated by wspr-analytics v{} from wspr.live data*\n",
        env!("CARGO_PKG_VERSION")
    ));

    footer
}

/// Generate a JSON report.
pub fn generate_json_report(report: &AnalysisReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::analysis::{analyse, AnalysisOptions};
    use crate::models::{Dataset, Spot};
    use chrono::{TimeZone, Utc};

    fn spot(reporter: &str, grid: &str, distance: f64, hour: u32, country: &str) -> Spot {
        Spot {
            timestamp: Utc.with_ymd_and_hms(2025, 8, 19, hour, 4, 0).unwrap(),
            reporter_call: reporter.to_string(),
            reporter_grid: grid.to_string(),
            transmitter_call: "2E0IJC".to_string(),
            transmitter_grid: "IO91".to_string(),
            frequency: 14_097_100.0,
            snr: -18.0,
            distance,
            country: country.to_string(),
        }
    }

    pub(crate) fn create_test_report() -> AnalysisReport {
        let dataset = Dataset::new(
            vec![
                spot("K1ABC", "FN42", 5265.0, 5, "United States"),
                spot("K1ABC", "FN42", 5270.0, 6, "United States"),
                spot("DL1XYZ", "", 650.0, 14, "Germany"),
            ],
            2,
        );
        let metrics = analyse(&dataset, &AnalysisOptions::default()).unwrap();
        let (first, last) = dataset.time_span().unwrap();

        AnalysisReport {
            metadata: ReportMetadata {
                call_sign: "2E0IJC".to_string(),
                window_start: Some(Utc.with_ymd_and_hms(2025, 8, 19, 0, 0, 0).unwrap()),
                window_end: Some(Utc.with_ymd_and_hms(2025, 8, 20, 0, 0, 0).unwrap()),
                first_spot: Some(first),
                last_spot: Some(last),
                generated_at: Utc::now(),
                data_file: "data/wspr_spots.csv".to_string(),
            },
            metrics,
        }
    }

    #[test]
    fn test_generate_markdown_report() {
        let report = create_test_report();
        let markdown = generate_markdown_report(&report);

        assert!(markdown.contains("# WSPR Analytics Report: 2E0IJC"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("## Summary"));
        assert!(markdown.contains("## Hourly Distance"));
        assert!(markdown.contains("## Top Call Signs"));
        assert!(markdown.contains("## Furthest Spots"));
        assert!(markdown.contains("## Furthest Reporters"));
        assert!(markdown.contains("## Spots by Country"));
        assert!(markdown.contains("## Distance Distribution"));
        assert!(markdown.contains("## Logarithmic Distance Distribution"));
        assert!(markdown.contains("| 1 | K1ABC | FN42 | 2 |"));
        assert!(markdown.contains("| United States | 2 |"));
        assert!(markdown.contains("| 05:00 | 1 | 5265 | 5265 | 5265 |"));
        assert!(markdown.contains("| 5000-5500 km | 2 |"));
    }

    #[test]
    fn test_skipped_rows_note() {
        let markdown = generate_markdown_report(&create_test_report());
        assert!(markdown.contains("2 malformed rows were skipped"));

        let mut report = create_test_report();
        report.metrics.counts.skipped_rows = 0;
        let markdown = generate_markdown_report(&report);
        assert!(!markdown.contains("malformed rows"));
    }

    #[test]
    fn test_generate_metadata_section() {
        let mut metadata = create_test_report().metadata;
        let section = generate_metadata_section(&metadata);

        assert!(section.contains("- **Call Sign:** 2E0IJC"));
        assert!(section.contains("2025-08-19 00:00:00 UTC to 2025-08-20 00:00:00 UTC"));
        assert!(section.contains("data/wspr_spots.csv"));

        metadata.call_sign = String::new();
        metadata.window_start = None;
        let section = generate_metadata_section(&metadata);
        assert!(!section.contains("Call Sign"));
        assert!(!section.contains("Requested Window"));
        assert!(section.contains("Spots Between"));
    }

    #[test]
    fn test_empty_grid_is_dashed() {
        let section = generate_reach_section(&create_test_report().metrics.furthest_by_reporter);
        assert!(section.contains("| 2 | DL1XYZ | - | 650 | 1 |"));
    }

    #[test]
    fn test_generate_json_report() {
        let report = create_test_report();
        let json = generate_json_report(&report).unwrap();

        assert!(json.contains("\"call_sign\""));
        assert!(json.contains("\"top_call_signs\""));
        assert!(json.contains("\"log_distance_bins\""));

        let parsed: AnalysisReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.metrics.counts, report.metrics.counts);
        assert_eq!(parsed.metrics.top_call_signs, report.metrics.top_call_signs);
    }
}
