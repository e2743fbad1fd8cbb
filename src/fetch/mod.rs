//! Spot retrieval.
//!
//! A [`SpotSource`] answers "spots for this transmitter in this window" with
//! raw CSV text. The [`Fetcher`] normalizes those rows to the dataset header
//! and replaces the dataset file atomically.

pub mod wspr_live;

pub use wspr_live::WsprLiveClient;

use crate::dataset::{parse_timestamp, write_dataset, SpotRecord, TIMESTAMP_FORMAT};
use crate::error::{AnalyticsError, AnalyticsResult};
use crate::geo::CountryLookup;
use crate::models::TimeWindow;
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Remote source of propagation reports.
#[async_trait]
pub trait SpotSource: Send + Sync {
    /// Return the CSV body (header row included) of all spots of
    /// `call_sign` inside `window`.
    async fn fetch(&self, call_sign: &str, window: &TimeWindow) -> AnalyticsResult<String>;
}

/// Result of a successful fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    /// Where the dataset was written.
    pub path: PathBuf,
    /// Rows written.
    pub rows: usize,
    /// Rows the source returned outside the requested window.
    pub out_of_window: usize,
    /// Rows the CSV reader could not split into fields.
    pub unreadable: usize,
}

/// Fetches spots from a [`SpotSource`] into the dataset file.
pub struct Fetcher<S> {
    source: S,
    dataset_path: PathBuf,
    countries: CountryLookup,
    show_progress: bool,
}

impl<S: SpotSource> Fetcher<S> {
    pub fn new(source: S, dataset_path: PathBuf, countries: CountryLookup) -> Self {
        Self {
            source,
            dataset_path,
            countries,
            show_progress: false,
        }
    }

    /// Show a spinner while the request is in flight.
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Fetch one window of spots and overwrite the dataset with them.
    ///
    /// Returns [`AnalyticsError::NoRows`] when nothing falls inside the
    /// window; the existing dataset is then left untouched.
    pub async fn fetch(&self, call_sign: &str, window: &TimeWindow) -> AnalyticsResult<FetchOutcome> {
        info!("Fetching spots for {} ({})", call_sign, window);

        let spinner = self.show_progress.then(|| {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.set_message(format!("Querying wspr.live for {}", call_sign));
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        });

        let result = self.source.fetch(call_sign, window).await;

        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }

        let body = result?;
        let normalized = normalize_rows(&body, window, &self.countries)?;

        if normalized.records.is_empty() {
            return Err(AnalyticsError::NoRows {
                call_sign: call_sign.to_string(),
            });
        }

        write_dataset(&self.dataset_path, &normalized.records)?;
        info!(
            "Saved {} spots to {}",
            normalized.records.len(),
            self.dataset_path.display()
        );

        Ok(FetchOutcome {
            path: self.dataset_path.clone(),
            rows: normalized.records.len(),
            out_of_window: normalized.out_of_window,
            unreadable: normalized.unreadable,
        })
    }
}

struct NormalizedRows {
    records: Vec<SpotRecord>,
    out_of_window: usize,
    unreadable: usize,
}

/// Map a raw response onto dataset records.
///
/// Rows with a timestamp outside `window` are dropped. Rows with an
/// unparseable timestamp are kept so the loader can count them as skipped.
fn normalize_rows(
    body: &str,
    window: &TimeWindow,
    countries: &CountryLookup,
) -> AnalyticsResult<NormalizedRows> {
    let mut out = NormalizedRows {
        records: Vec::new(),
        out_of_window: 0,
        unreadable: 0,
    };

    if body.trim().is_empty() {
        return Ok(out);
    }

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());
    reader.headers()?;

    for row in reader.deserialize::<SpotRecord>() {
        let mut record = match row {
            Ok(record) => record,
            Err(e) => {
                warn!("Dropping unreadable response row: {}", e);
                out.unreadable += 1;
                continue;
            }
        };

        if let Some(ts) = parse_timestamp(&record.timestamp) {
            if !window.contains(ts) {
                debug!("Dropping spot at {} outside {}", ts, window);
                out.out_of_window += 1;
                continue;
            }
            record.timestamp = ts.format(TIMESTAMP_FORMAT).to_string();
        }

        record.reporter_call = record.reporter_call.trim().to_ascii_uppercase();
        record.transmitter_call = record.transmitter_call.trim().to_ascii_uppercase();
        if record.country.is_empty() && !record.reporter_call.is_empty() {
            record.country = countries.country_for(&record.reporter_call);
        }

        out.records.push(record);
    }

    Ok(out)
}
