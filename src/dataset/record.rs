//! Row shape of the dataset file and its validation into a [`Spot`].

use crate::error::{AnalyticsError, AnalyticsResult};
use crate::geo::{grid_distance_km, CountryLookup};
use crate::models::Spot;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp layout used by wspr.live and by the dataset file.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One untyped dataset row.
///
/// Field names are the stable dataset header; the aliases accept the column
/// names served by wspr.live so a raw download loads as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpotRecord {
    #[serde(alias = "time", default)]
    pub timestamp: String,
    #[serde(alias = "rx_sign", default)]
    pub reporter_call: String,
    #[serde(alias = "rx_loc", default)]
    pub reporter_grid: String,
    #[serde(alias = "tx_sign", default)]
    pub transmitter_call: String,
    #[serde(alias = "tx_loc", default)]
    pub transmitter_grid: String,
    #[serde(default)]
    pub frequency: String,
    #[serde(default)]
    pub snr: String,
    #[serde(default)]
    pub distance: String,
    #[serde(default)]
    pub country: String,
}

/// Parse a dataset timestamp (`2025-08-19 14:02:00` or RFC 3339).
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        })
}

impl SpotRecord {
    /// Validate and normalize this row.
    ///
    /// `line` is only used to label the error. A missing distance is derived
    /// from the two grids; a missing country from the reporter's call sign.
    pub fn into_spot(self, line: u64, countries: &CountryLookup) -> AnalyticsResult<Spot> {
        let malformed = |reason: String| AnalyticsError::MalformedRow { line, reason };

        let timestamp = parse_timestamp(&self.timestamp)
            .ok_or_else(|| malformed(format!("unparseable timestamp {:?}", self.timestamp)))?;

        let reporter_call = self.reporter_call.trim().to_ascii_uppercase();
        let transmitter_call = self.transmitter_call.trim().to_ascii_uppercase();
        if reporter_call.is_empty() || transmitter_call.is_empty() {
            return Err(malformed("missing call sign".to_string()));
        }

        let reporter_grid = self.reporter_grid.trim().to_string();
        let transmitter_grid = self.transmitter_grid.trim().to_string();

        let distance = match self.distance.trim() {
            "" => grid_distance_km(&reporter_grid, &transmitter_grid).ok_or_else(|| {
                malformed("no distance and grids do not decode".to_string())
            })?,
            text => parse_number(text, "distance").map_err(malformed)?,
        };
        if !distance.is_finite() || distance < 0.0 {
            return Err(malformed(format!("invalid distance {}", distance)));
        }

        let frequency = parse_optional_number(&self.frequency, "frequency").map_err(malformed)?;
        let snr = parse_optional_number(&self.snr, "snr").map_err(malformed)?;

        let country = match self.country.trim() {
            "" => countries.country_for(&reporter_call),
            supplied => supplied.to_string(),
        };

        Ok(Spot {
            timestamp,
            reporter_call,
            reporter_grid,
            transmitter_call,
            transmitter_grid,
            frequency,
            snr,
            distance,
            country,
        })
    }
}

fn parse_number(text: &str, field: &str) -> Result<f64, String> {
    text.trim()
        .parse::<f64>()
        .map_err(|_| format!("unparseable {} {:?}", field, text))
}

fn parse_optional_number(text: &str, field: &str) -> Result<f64, String> {
    if text.trim().is_empty() {
        Ok(0.0)
    } else {
        parse_number(text, field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record() -> SpotRecord {
        SpotRecord {
            timestamp: "2025-08-19 14:02:00".to_string(),
            reporter_call: "k1abc".to_string(),
            reporter_grid: "FN42".to_string(),
            transmitter_call: "2E0IJC".to_string(),
            transmitter_grid: "IO91".to_string(),
            frequency: "14097063".to_string(),
            snr: "-18".to_string(),
            distance: "5265".to_string(),
            country: String::new(),
        }
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2025, 8, 19, 14, 2, 0).unwrap();
        assert_eq!(parse_timestamp("2025-08-19 14:02:00"), Some(expected));
        assert_eq!(parse_timestamp("2025-08-19T14:02:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2025-08-19T16:02:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_into_spot_normalizes() {
        let spot = record().into_spot(2, &CountryLookup::builtin()).unwrap();
        assert_eq!(spot.reporter_call, "K1ABC");
        assert_eq!(spot.distance, 5265.0);
        assert_eq!(spot.snr, -18.0);
        assert_eq!(spot.frequency, 14_097_063.0);
        assert_eq!(spot.country, "United States");
    }

    #[test]
    fn test_supplied_country_is_kept() {
        let mut row = record();
        row.country = "Testland".to_string();
        let spot = row.into_spot(2, &CountryLookup::builtin()).unwrap();
        assert_eq!(spot.country, "Testland");
    }

    #[test]
    fn test_missing_distance_is_computed_from_grids() {
        let mut row = record();
        row.distance = String::new();
        let spot = row.into_spot(2, &CountryLookup::builtin()).unwrap();
        assert!((5000.0..5500.0).contains(&spot.distance));
    }

    #[test]
    fn test_malformed_rows() {
        let lookup = CountryLookup::builtin();

        let mut row = record();
        row.timestamp = "not a time".to_string();
        assert!(matches!(
            row.into_spot(3, &lookup),
            Err(AnalyticsError::MalformedRow { line: 3, .. })
        ));

        let mut row = record();
        row.distance = "far".to_string();
        assert!(row.into_spot(4, &lookup).is_err());

        let mut row = record();
        row.distance = "-10".to_string();
        assert!(row.into_spot(5, &lookup).is_err());

        let mut row = record();
        row.reporter_call = "  ".to_string();
        assert!(row.into_spot(6, &lookup).is_err());

        let mut row = record();
        row.distance = String::new();
        row.reporter_grid = String::new();
        assert!(row.into_spot(7, &lookup).is_err());
    }
}
