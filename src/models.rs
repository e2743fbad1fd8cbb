//! Data models for WSPR analytics.
//!
//! This module contains the core data structures used throughout the
//! application: validated spots, the loaded dataset, the time window a
//! fetch covers, and the metrics produced by the aggregator.

use crate::error::{AnalyticsError, AnalyticsResult};
use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One propagation report: a reporter hearing a transmitter.
#[derive(Debug, Clone, PartialEq)]
pub struct Spot {
    /// When the spot was logged (UTC).
    pub timestamp: DateTime<Utc>,
    /// Call sign of the receiving station.
    pub reporter_call: String,
    /// Maidenhead locator of the receiving station (may be empty).
    pub reporter_grid: String,
    /// Call sign of the transmitting station.
    pub transmitter_call: String,
    /// Maidenhead locator of the transmitting station (may be empty).
    pub transmitter_grid: String,
    /// Received frequency in Hz.
    pub frequency: f64,
    /// Signal-to-noise ratio in dB.
    pub snr: f64,
    /// Great-circle distance between the stations in km.
    pub distance: f64,
    /// Reporter's country.
    pub country: String,
}

impl Spot {
    /// UTC hour of day (0-23) the spot was logged in.
    pub fn hour(&self) -> u32 {
        self.timestamp.hour()
    }
}

/// The in-memory table produced by the loader.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    /// Valid spots in file order.
    pub spots: Vec<Spot>,
    /// Number of rows that failed validation and were left out.
    pub skipped: usize,
}

impl Dataset {
    pub fn new(spots: Vec<Spot>, skipped: usize) -> Self {
        Self { spots, skipped }
    }

    /// Number of valid rows.
    pub fn len(&self) -> usize {
        self.spots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spots.is_empty()
    }

    /// Valid plus skipped rows.
    pub fn total_rows(&self) -> usize {
        self.spots.len() + self.skipped
    }

    /// Earliest and latest spot timestamps.
    pub fn time_span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let first = self.spots.iter().map(|s| s.timestamp).min()?;
        let last = self.spots.iter().map(|s| s.timestamp).max()?;
        Some((first, last))
    }
}

/// A closed time interval `[start, start + duration]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub duration: Duration,
}

impl TimeWindow {
    /// The window of `duration` that ends at `end`.
    pub fn ending_at(end: DateTime<Utc>, duration: Duration) -> AnalyticsResult<Self> {
        let start = end.checked_sub_signed(duration).ok_or_else(|| {
            AnalyticsError::Configuration(format!(
                "period of {} days reaches before the earliest date",
                duration.num_days()
            ))
        })?;
        Ok(Self { start, duration })
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.start + self.duration
    }

    /// Whether `ts` falls inside the window, bounds included.
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts <= self.end()
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to {} UTC",
            self.start.format("%Y-%m-%d %H:%M:%S"),
            self.end().format("%Y-%m-%d %H:%M:%S")
        )
    }
}

/// Headline counts over the dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryCounts {
    /// Valid plus skipped rows.
    pub total_rows: usize,
    /// Rows that made it into the analysis.
    pub valid_rows: usize,
    /// Rows dropped as malformed.
    pub skipped_rows: usize,
    /// Distinct (reporter, transmitter) pairs.
    pub unique_spots: usize,
    /// Distinct reporter call signs.
    pub unique_reporters: usize,
    /// Distinct grid squares over reporter and transmitter columns.
    pub unique_grids: usize,
    /// Distinct 4-character grid squares.
    pub unique_grids_4: usize,
}

/// Distance statistics for one UTC hour of day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyDistance {
    pub hour: u32,
    pub spots: usize,
    pub mean_km: f64,
    pub min_km: f64,
    pub max_km: f64,
}

/// How often a reporter heard the transmitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSignCount {
    pub call_sign: String,
    pub count: usize,
    /// The reporter's most frequently logged grid.
    pub grid: String,
}

/// Full detail of one spot, ranked by distance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FurthestSpot {
    pub timestamp: DateTime<Utc>,
    pub reporter_call: String,
    pub reporter_grid: String,
    pub transmitter_call: String,
    pub transmitter_grid: String,
    pub distance_km: f64,
    pub snr: f64,
}

impl From<&Spot> for FurthestSpot {
    fn from(spot: &Spot) -> Self {
        Self {
            timestamp: spot.timestamp,
            reporter_call: spot.reporter_call.clone(),
            reporter_grid: spot.reporter_grid.clone(),
            transmitter_call: spot.transmitter_call.clone(),
            transmitter_grid: spot.transmitter_grid.clone(),
            distance_km: spot.distance,
            snr: spot.snr,
        }
    }
}

/// A reporter's best distance together with its spot count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationReach {
    pub call_sign: String,
    pub grid: String,
    pub distance_km: f64,
    pub spots: usize,
}

/// Spots heard from one country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryCount {
    pub country: String,
    pub spots: usize,
}

/// One bin of a distance histogram. `upper_km == None` marks the open overflow bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceBin {
    pub lower_km: f64,
    pub upper_km: Option<f64>,
    pub spots: usize,
}

impl DistanceBin {
    /// Human readable range, e.g. `500-1000 km` or `20000+ km`.
    pub fn label(&self) -> String {
        match self.upper_km {
            Some(upper) => format!("{}-{} km", self.lower_km as u64, upper as u64),
            None => format!("{}+ km", self.lower_km as u64),
        }
    }
}

/// Everything the aggregator computes for one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub counts: SummaryCounts,
    /// Only hours that have spots, ascending.
    pub hourly: Vec<HourlyDistance>,
    pub top_call_signs: Vec<CallSignCount>,
    pub furthest: Vec<FurthestSpot>,
    pub furthest_by_reporter: Vec<StationReach>,
    pub countries: Vec<CountryCount>,
    /// Dense fixed-width bins, overflow bin last.
    pub distance_bins: Vec<DistanceBin>,
    /// Dense bins of equal width in log(1 + km) space.
    pub log_distance_bins: Vec<DistanceBin>,
    /// Malformed rows left out of every computation.
    pub skipped: usize,
}

/// Report metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Transmitter the spots were fetched for; empty if unknown.
    pub call_sign: String,
    /// Requested window, when this run fetched.
    pub window_start: Option<DateTime<Utc>>,
    pub window_end: Option<DateTime<Utc>>,
    /// Observed span of the analysed spots.
    pub first_spot: Option<DateTime<Utc>>,
    pub last_spot: Option<DateTime<Utc>>,
    pub generated_at: DateTime<Utc>,
    /// Dataset file the metrics were computed from.
    pub data_file: String,
}

/// The complete analysis report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub metadata: ReportMetadata,
    pub metrics: MetricsSummary,
}
