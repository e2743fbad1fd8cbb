//! Command-line flags.
//!
//! Flags mirror the config file sections and override them when given.

use crate::config::parse_period;
use clap::Parser;
use std::path::PathBuf;

/// wspr-analytics - fetch and analyse WSPR propagation spots
///
/// Downloads the spots a transmitter produced over a recent window from
/// wspr.live, stores them as CSV and reports distance, station and
/// country statistics as Markdown or JSON.
///
/// Examples:
///   wspr-analytics --call-sign 2E0IJC
///   wspr-analytics -c 2E0IJC --period "2 hours" --top-n 20
///   wspr-analytics --skip-fetch --format json -o report.json
///   wspr-analytics -c 2E0IJC --dry-run
///   wspr-analytics --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Transmitter call sign to fetch spots for
    ///
    /// Can also be set via WSPR_CALL_SIGN env var or .wspr-analytics.toml.
    #[arg(short, long, value_name = "CALL", env = "WSPR_CALL_SIGN")]
    pub call_sign: Option<String>,

    /// Length of the window ending now, e.g. "30 minutes" or "1 day"
    #[arg(short, long, value_name = "PERIOD")]
    pub period: Option<String>,

    /// Number of entries in the top call sign and furthest station lists
    #[arg(long, value_name = "COUNT")]
    pub top_n: Option<usize>,

    /// Width of the distance histogram bins in km
    #[arg(long, value_name = "KM")]
    pub bin_width: Option<f64>,

    /// Directory holding the dataset and exported tables
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Output file path for the report
    #[arg(short, long, default_value = "wspr_report.md", value_name = "FILE")]
    pub output: PathBuf,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Path to configuration file
    ///
    /// If not specified, looks for .wspr-analytics.toml in the current directory
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// HTTP request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Analyse the existing dataset file without fetching
    #[arg(long)]
    pub skip_fetch: bool,

    /// Print the query URL and exit without making a request
    #[arg(long)]
    pub dry_run: bool,

    /// Also write every metrics table as CSV into the data directory
    #[arg(long)]
    pub export_tables: bool,

    /// Generate a default .wspr-analytics.toml configuration file
    #[arg(long, conflicts_with = "reset_config")]
    pub init_config: bool,

    /// Overwrite .wspr-analytics.toml with the default settings
    #[arg(long)]
    pub reset_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Whether this run only manages the config file.
    pub fn manages_config(&self) -> bool {
        self.init_config || self.reset_config
    }

    /// Validate the parsed arguments.
    ///
    /// A missing call sign is checked after the config file is merged,
    /// since it may come from there.
    pub fn validate(&self) -> Result<(), String> {
        if self.manages_config() {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref call_sign) = self.call_sign {
            let call_sign = call_sign.trim();
            if call_sign.is_empty() {
                return Err("Call sign must not be empty".to_string());
            }
            if !call_sign
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '/')
            {
                return Err(format!(
                    "Call sign may only contain letters, digits and '/': {}",
                    call_sign
                ));
            }
        }

        if let Some(ref period) = self.period {
            parse_period(period).map_err(|e| e.to_string())?;
        }

        if self.top_n == Some(0) {
            return Err("--top-n must be at least 1".to_string());
        }

        if let Some(width) = self.bin_width {
            if !(width > 0.0) || !width.is_finite() {
                return Err("--bin-width must be a positive number of km".to_string());
            }
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if self.skip_fetch && self.dry_run {
            return Err("--dry-run has nothing to show with --skip-fetch".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
