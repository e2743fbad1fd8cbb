//! Error taxonomy for the fetch, load and analysis pipeline.

use thiserror::Error;

/// Errors raised by the analytics pipeline.
///
/// Row-level parse failures (`MalformedRow`) are recovered by the loader and
/// only tallied; everything else propagates to the caller.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// The remote request failed (connection, timeout, HTTP status).
    #[error("failed to fetch spots: {0}")]
    Retrieval(String),

    /// The remote request succeeded but returned no rows for the window.
    #[error("no spots returned for {call_sign} in the requested window")]
    NoRows { call_sign: String },

    /// A single dataset row could not be parsed.
    #[error("malformed row at line {line}: {reason}")]
    MalformedRow { line: u64, reason: String },

    /// Analysis was requested on a dataset with zero valid rows.
    #[error("dataset contains no valid spots ({skipped} malformed rows skipped)")]
    EmptyDataset { skipped: usize },

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl AnalyticsError {
    /// True for the "nothing to show" family of errors.
    ///
    /// Callers render these as "no data" rather than as a failure.
    pub fn is_no_data(&self) -> bool {
        matches!(
            self,
            AnalyticsError::NoRows { .. } | AnalyticsError::EmptyDataset { .. }
        )
    }
}

pub type AnalyticsResult<T> = std::result::Result<T, AnalyticsError>;
