//! Reads the dataset file into a validated [`Dataset`].

use crate::dataset::record::SpotRecord;
use crate::error::{AnalyticsError, AnalyticsResult};
use crate::geo::CountryLookup;
use crate::models::{Dataset, Spot};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

/// Load the dataset at `path`.
///
/// Rows that fail to parse are skipped and tallied in [`Dataset::skipped`];
/// only I/O and header-level CSV errors fail the load.
pub fn load_dataset(path: &Path, countries: &CountryLookup) -> AnalyticsResult<Dataset> {
    debug!("Loading dataset from {}", path.display());
    let file = File::open(path)?;
    let dataset = read_dataset(file, countries)?;

    info!(
        "Loaded {} spots from {} ({} skipped)",
        dataset.len(),
        path.display(),
        dataset.skipped
    );
    Ok(dataset)
}

/// Read a dataset from any CSV source with a header row.
pub fn read_dataset<R: Read>(source: R, countries: &CountryLookup) -> AnalyticsResult<Dataset> {
    let (spots, rejected) = parse_rows(source, countries)?;
    for error in &rejected {
        warn!("Skipping {}", error);
    }
    Ok(Dataset::new(spots, rejected.len()))
}

/// Split rows into valid spots and `MalformedRow` errors.
///
/// Line numbers are taken from the reader, so quoted fields spanning
/// several lines do not shift the rows after them.
fn parse_rows<R: Read>(
    source: R,
    countries: &CountryLookup,
) -> AnalyticsResult<(Vec<Spot>, Vec<AnalyticsError>)> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(source);

    // Surface a missing or unreadable header as an error rather than "no rows".
    let headers = reader.headers()?.clone();

    let mut spots = Vec::new();
    let mut rejected = Vec::new();
    let mut row = csv::StringRecord::new();

    loop {
        match reader.read_record(&mut row) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                rejected.push(AnalyticsError::MalformedRow {
                    line: e.position().map_or(0, |p| p.line()),
                    reason: e.to_string(),
                });
                continue;
            }
        }

        let line = row.position().map_or(0, |p| p.line());
        let parsed = row
            .deserialize::<SpotRecord>(Some(&headers))
            .map_err(|e| AnalyticsError::MalformedRow {
                line,
                reason: e.to_string(),
            })
            .and_then(|record| record.into_spot(line, countries));

        match parsed {
            Ok(spot) => spots.push(spot),
            Err(e) => rejected.push(e),
        }
    }

    Ok((spots, rejected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DATASET: &str = "\
timestamp,reporter_call,reporter_grid,transmitter_call,transmitter_grid,frequency,snr,distance,country
2025-08-19 05:10:00,AB1CD,FN42,2E0IJC,IO91,14097063,-20,100,US
2025-08-19 05:20:00,AB1CD,FN42,2E0IJC,IO91,14097063,-12,300,US
garbage,XY9Z,FN03,2E0IJC,IO91,14097063,-5,50,CA
2025-08-19 14:00:00,XY9Z,FN03,2E0IJC,IO91,14097063,-5,50,CA
";

    #[test]
    fn test_read_dataset_skips_malformed_rows() {
        let dataset = read_dataset(DATASET.as_bytes(), &CountryLookup::builtin()).unwrap();
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.skipped, 1);
        assert_eq!(dataset.total_rows(), 4);
        assert_eq!(dataset.spots[2].reporter_call, "XY9Z");
        assert_eq!(dataset.spots[2].country, "CA");
    }

    #[test]
    fn test_read_raw_wspr_live_columns() {
        let raw = "\
id,time,band,rx_sign,rx_lat,rx_lon,rx_loc,tx_sign,tx_lat,tx_lon,tx_loc,distance,azimuth,rx_azimuth,frequency,power,snr,drift,version,code
1,2025-08-19 10:00:00,14,DL1ABC,50.0,8.0,JO40,2E0IJC,51.5,-1.0,IO91,650,100,280,14097050,23,-22,0,2.6.1,1
";
        let dataset = read_dataset(raw.as_bytes(), &CountryLookup::builtin()).unwrap();
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.skipped, 0);

        let spot = &dataset.spots[0];
        assert_eq!(spot.reporter_call, "DL1ABC");
        assert_eq!(spot.reporter_grid, "JO40");
        assert_eq!(spot.transmitter_grid, "IO91");
        assert_eq!(spot.distance, 650.0);
        assert_eq!(spot.snr, -22.0);
        assert_eq!(spot.country, "Germany");
    }

    #[test]
    fn test_short_rows_are_skipped() {
        let data = "\
timestamp,reporter_call,transmitter_call,distance
2025-08-19 10:00:00,K1ABC,2E0IJC
2025-08-19 10:02:00,K1ABC,2E0IJC,5000
";
        let dataset = read_dataset(data.as_bytes(), &CountryLookup::builtin()).unwrap();
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.skipped, 1);
    }

    #[test]
    fn test_malformed_row_lines_follow_multiline_fields() {
        let data = "\
timestamp,reporter_call,reporter_grid,transmitter_call,transmitter_grid,frequency,snr,distance,country
2025-08-19 05:10:00,AB1CD,FN42,2E0IJC,IO91,14097063,-20,100,\"United
States\"
garbage,XY9Z,FN03,2E0IJC,IO91,14097063,-5,50,CA
2025-08-19 14:00:00,XY9Z
";
        let (spots, rejected) = parse_rows(data.as_bytes(), &CountryLookup::builtin()).unwrap();
        assert_eq!(spots.len(), 1);
        assert_eq!(spots[0].country, "United\nStates");

        let lines: Vec<u64> = rejected
            .iter()
            .map(|e| match e {
                AnalyticsError::MalformedRow { line, .. } => *line,
                other => panic!("unexpected error: {}", other),
            })
            .collect();
        assert_eq!(lines, vec![4, 5]);
    }

    #[test]
    fn test_header_only_is_empty_dataset() {
        let data = "timestamp,reporter_call,transmitter_call,distance\n";
        let dataset = read_dataset(data.as_bytes(), &CountryLookup::builtin()).unwrap();
        assert!(dataset.is_empty());
        assert_eq!(dataset.skipped, 0);
    }

    #[test]
    fn test_load_dataset_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("spots.csv");
        std::fs::write(&path, DATASET).unwrap();

        let dataset = load_dataset(&path, &CountryLookup::builtin()).unwrap();
        assert_eq!(dataset.len(), 3);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let temp_dir = TempDir::new().unwrap();
        assert!(load_dataset(&temp_dir.path().join("missing.csv"), &CountryLookup::builtin()).is_err());
    }
}
