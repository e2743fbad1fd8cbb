//! Configuration file handling.
//!
//! This module handles loading, validating and merging configuration from
//! `.wspr-analytics.toml` files.

use crate::analysis::AnalysisOptions;
use crate::error::{AnalyticsError, AnalyticsResult};
use anyhow::{Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Longest accepted look-back period.
pub const MAX_PERIOD_DAYS: i64 = 3650;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".wspr-analytics.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Station and time window.
    #[serde(default)]
    pub station: StationConfig,

    /// Aggregation settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Remote service settings.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Where files are written.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Which transmitter to look up, and over what period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationConfig {
    /// Transmitter call sign to query.
    #[serde(default)]
    pub call_sign: String,

    /// Look-back period, e.g. "30 minutes", "6 hours", "2 days".
    #[serde(default = "default_period")]
    pub period: String,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            call_sign: String::new(),
            period: default_period(),
        }
    }
}

fn default_period() -> String {
    "30 minutes".to_string()
}

/// Aggregator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Number of top/furthest stations to report.
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Width of each distance histogram bin in km.
    #[serde(default = "default_bin_width")]
    pub bin_width_km: f64,

    /// Cap on regular distance bins before the overflow bin.
    #[serde(default = "default_max_bins")]
    pub max_bins: usize,

    /// Number of logarithmic distance bins.
    #[serde(default = "default_log_bins")]
    pub log_bins: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            bin_width_km: default_bin_width(),
            max_bins: default_max_bins(),
            log_bins: default_log_bins(),
        }
    }
}

fn default_top_n() -> usize {
    10
}

fn default_bin_width() -> f64 {
    500.0
}

fn default_max_bins() -> usize {
    40 // 20,000 km, roughly half the Earth's circumference
}

fn default_log_bins() -> usize {
    8
}

/// Remote service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Base URL of the wspr.live service.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "http://wspr.live".to_string()
}

fn default_timeout() -> u64 {
    60
}

/// File locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the dataset and exported tables.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory for rolling log files.
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Write every metrics table as CSV next to the dataset.
    #[serde(default)]
    pub export_tables: bool,

    /// Optional `prefix,country` CSV extending the built-in prefix table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_prefix_file: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_dir: default_log_dir(),
            export_tables: false,
            country_prefix_file: None,
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were actually given.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref call_sign) = args.call_sign {
            self.station.call_sign = call_sign.clone();
        }
        if let Some(ref period) = args.period {
            self.station.period = period.clone();
        }

        if let Some(top_n) = args.top_n {
            self.analysis.top_n = top_n;
        }
        if let Some(width) = args.bin_width {
            self.analysis.bin_width_km = width;
        }

        if let Some(timeout) = args.timeout {
            self.fetch.timeout_seconds = timeout;
        }

        if let Some(ref dir) = args.data_dir {
            self.storage.data_dir = dir.clone();
        }

        // Flags always override
        if args.export_tables {
            self.storage.export_tables = true;
        }
    }

    /// Reject out-of-range values before any fetch or aggregation runs.
    pub fn validate(&self) -> AnalyticsResult<()> {
        AnalysisOptions::from(&self.analysis).validate()?;
        if self.fetch.timeout_seconds == 0 {
            return Err(AnalyticsError::Configuration(
                "timeout_seconds must be at least 1".to_string(),
            ));
        }
        self.period()?;
        Ok(())
    }

    /// The station call sign, upper-cased.
    ///
    /// Only required when spots are fetched, so [`Config::validate`] does
    /// not check it.
    pub fn call_sign(&self) -> AnalyticsResult<String> {
        let call_sign = self.station.call_sign.trim();
        if call_sign.is_empty() {
            return Err(AnalyticsError::Configuration(
                "no call sign given; use --call-sign, WSPR_CALL_SIGN or [station] call_sign"
                    .to_string(),
            ));
        }
        Ok(call_sign.to_ascii_uppercase())
    }

    /// The configured look-back period.
    pub fn period(&self) -> AnalyticsResult<Duration> {
        parse_period(&self.station.period)
    }

    /// Path of the persisted dataset.
    pub fn dataset_path(&self) -> PathBuf {
        self.storage.data_dir.join(crate::dataset::DATASET_FILE_NAME)
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

/// Parse a period such as `"10 minutes"`, `"1 hour"` or `"3 days"`.
pub fn parse_period(text: &str) -> AnalyticsResult<Duration> {
    let invalid = || AnalyticsError::Configuration(format!("invalid period: {:?}", text));

    let mut parts = text.split_whitespace();
    let number: i64 = parts
        .next()
        .and_then(|n| n.parse().ok())
        .ok_or_else(invalid)?;
    let unit = parts.next().ok_or_else(invalid)?.to_ascii_lowercase();
    if parts.next().is_some() {
        return Err(invalid());
    }

    if number <= 0 {
        return Err(AnalyticsError::Configuration(format!(
            "period must be positive, got {:?}",
            text
        )));
    }

    let duration = if unit.starts_with("minute") {
        Duration::try_minutes(number)
    } else if unit.starts_with("hour") {
        Duration::try_hours(number)
    } else if unit.starts_with("day") {
        Duration::try_days(number)
    } else {
        return Err(AnalyticsError::Configuration(format!(
            "unknown period unit: {}",
            unit
        )));
    };

    match duration {
        Some(duration) if duration <= Duration::days(MAX_PERIOD_DAYS) => Ok(duration),
        _ => Err(AnalyticsError::Configuration(format!(
            "period {:?} is longer than {} days",
            text, MAX_PERIOD_DAYS
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.analysis.top_n, 10);
        assert_eq!(config.analysis.bin_width_km, 500.0);
        assert_eq!(config.station.period, "30 minutes");
        assert_eq!(config.fetch.base_url, "http://wspr.live");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[station]
call_sign = "2E0IJC"
period = "6 hours"

[analysis]
top_n = 5
bin_width_km = 1000.0

[storage]
data_dir = "out"
export_tables = true
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.station.call_sign, "2E0IJC");
        assert_eq!(config.period().unwrap(), Duration::hours(6));
        assert_eq!(config.analysis.top_n, 5);
        assert_eq!(config.analysis.bin_width_km, 1000.0);
        assert_eq!(config.analysis.log_bins, 8);
        assert_eq!(config.storage.data_dir, PathBuf::from("out"));
        assert!(config.storage.export_tables);
        assert_eq!(config.fetch.timeout_seconds, 60);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[station]"));
        assert!(toml_str.contains("[analysis]"));
        assert!(toml_str.contains("[fetch]"));
        assert!(toml_str.contains("[storage]"));

        let reparsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(reparsed.analysis.top_n, 10);
    }

    #[test]
    fn test_validate_rejects_zero_top_n() {
        let mut config = Config::default();
        config.analysis.top_n = 0;
        assert!(matches!(
            config.validate(),
            Err(AnalyticsError::Configuration(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_bins_and_period() {
        let mut config = Config::default();
        config.analysis.bin_width_km = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.analysis.log_bins = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.station.period = "0 minutes".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_period() {
        assert_eq!(parse_period("10 minutes").unwrap(), Duration::minutes(10));
        assert_eq!(parse_period("1 minute").unwrap(), Duration::minutes(1));
        assert_eq!(parse_period("3 hours").unwrap(), Duration::hours(3));
        assert_eq!(parse_period("14 Days").unwrap(), Duration::days(14));
    }

    #[test]
    fn test_parse_period_rejects_huge_values() {
        assert!(parse_period("3650 days").is_ok());
        assert!(matches!(
            parse_period("3651 days"),
            Err(AnalyticsError::Configuration(_))
        ));
        assert!(parse_period("100000000 days").is_err());
        assert!(parse_period("200000000000 days").is_err());
        assert!(parse_period("9223372036854775807 minutes").is_err());

        let mut config = Config::default();
        config.station.period = "100000000 days".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_infinite_bin_width() {
        let mut config = Config::default();
        config.analysis.bin_width_km = f64::INFINITY;
        assert!(matches!(
            config.validate(),
            Err(AnalyticsError::Configuration(_))
        ));

        let config: Config = toml::from_str("[analysis]\nbin_width_km = inf\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_period_errors() {
        assert!(parse_period("").is_err());
        assert!(parse_period("ten minutes").is_err());
        assert!(parse_period("10").is_err());
        assert!(parse_period("10 fortnights").is_err());
        assert!(parse_period("-5 minutes").is_err());
        assert!(parse_period("5 minutes ago").is_err());
    }

    #[test]
    fn test_merge_with_args() {
        let mut config = Config::default();
        config.analysis.top_n = 7;
        config.storage.data_dir = PathBuf::from("from-file");

        let mut args = crate::cli::tests::make_args();
        args.period = Some("2 hours".to_string());
        args.bin_width = Some(250.0);
        args.export_tables = true;
        config.merge_with_args(&args);

        assert_eq!(config.station.call_sign, "2E0IJC");
        assert_eq!(config.period().unwrap(), Duration::hours(2));
        assert_eq!(config.analysis.bin_width_km, 250.0);
        assert!(config.storage.export_tables);
        // Not given on the command line
        assert_eq!(config.analysis.top_n, 7);
        assert_eq!(config.storage.data_dir, PathBuf::from("from-file"));
    }

    #[test]
    fn test_call_sign_required() {
        let mut config = Config::default();
        assert!(matches!(
            config.call_sign(),
            Err(AnalyticsError::Configuration(_))
        ));

        config.station.call_sign = " 2e0ijc ".to_string();
        assert_eq!(config.call_sign().unwrap(), "2E0IJC");
    }

    #[test]
    fn test_dataset_path() {
        let mut config = Config::default();
        config.storage.data_dir = PathBuf::from("/tmp/wspr");
        assert_eq!(
            config.dataset_path(),
            PathBuf::from("/tmp/wspr/wspr_spots.csv")
        );
    }
}
