//! wspr-analytics - WSPR spot fetcher and propagation analyser
//!
//! A CLI tool that downloads the spots a transmitter produced from
//! wspr.live, stores them as CSV and reports distance, station and
//! country statistics.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (configuration, retrieval, I/O, etc.)
//!   2 - No data (nothing fetched, or no valid rows to analyse)

mod analysis;
mod cli;
mod config;
mod dataset;
mod error;
mod fetch;
mod geo;
mod models;
mod report;

use analysis::AnalysisOptions;
use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE_NAME};
use error::AnalyticsError;
use fetch::{Fetcher, WsprLiveClient};
use geo::CountryLookup;
use models::{AnalysisReport, MetricsSummary, ReportMetadata, TimeWindow};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// Rolling log file name inside the configured log directory.
const LOG_FILE_NAME: &str = "wspr-analytics.log";

/// Env var overriding the log file filter, e.g. `wspr_analytics=trace`.
const LOG_FILTER_ENV: &str = "WSPR_ANALYTICS_LOG";

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config / --reset-config early (no logging needed)
    if args.manages_config() {
        return handle_config_file(&args);
    }

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    let guard = match init_logging(&args, &config.storage.log_dir) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };

    info!("wspr-analytics v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    debug!("Configuration: {:?}", config);

    let exit_code = match run(&args, &config).await {
        Ok(code) => code,
        Err(e) => {
            let code = exit_code_for(&e);
            if code == 2 {
                error!("No data: {:#}", e);
                eprintln!("\n⚠️  No data: {:#}", e);
            } else {
                error!("Run failed: {:#}", e);
                eprintln!("\n❌ Error: {:#}", e);
            }
            code
        }
    };

    // Flush the file writer before exiting.
    drop(guard);
    std::process::exit(exit_code);
}

/// Map an error to the process exit code.
fn exit_code_for(e: &anyhow::Error) -> i32 {
    match e.downcast_ref::<AnalyticsError>() {
        Some(err) if err.is_no_data() => 2,
        _ => 1,
    }
}

/// Handle --init-config and --reset-config.
fn handle_config_file(args: &Args) -> Result<()> {
    let path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));

    if args.init_config && path.exists() {
        eprintln!(
            "⚠️  {} already exists. Use --reset-config to restore the defaults.",
            path.display()
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(&path, &content)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    if args.reset_config {
        println!("✅ Reset {} to default settings.", path.display());
    } else {
        println!("✅ Created {} with default settings.", path.display());
        println!("   Set [station] call_sign to skip --call-sign on every run.");
    }
    Ok(())
}

/// Initialize console and rolling file logging.
///
/// The returned guard must be held until exit, or buffered file output is lost.
fn init_logging(args: &Args, log_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_NAME);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .with_writer(std::io::stderr)
        .with_filter(LevelFilter::from_level(args.log_level()));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_writer(file_writer)
        .with_filter(
            EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("debug")),
        );

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to set tracing subscriber")?;

    Ok(guard)
}

/// Load configuration from file or use defaults, then apply CLI overrides.
fn load_config(args: &Args) -> Result<Config> {
    let mut config = if let Some(ref config_path) = args.config {
        Config::load(config_path)?
    } else {
        match Config::load_default() {
            Ok(Some(config)) => config,
            Ok(None) => Config::default(),
            Err(e) => {
                eprintln!("⚠️  Ignoring {}: {:#}", CONFIG_FILE_NAME, e);
                Config::default()
            }
        }
    };

    config.merge_with_args(args);
    config.validate()?;
    Ok(config)
}

/// Country prefixes, with the configured override file applied.
fn load_countries(config: &Config) -> Result<CountryLookup> {
    match config.storage.country_prefix_file {
        Some(ref path) => {
            info!("Loading country prefixes from {}", path.display());
            CountryLookup::with_prefix_file(path).with_context(|| {
                format!("Failed to load country prefix file {}", path.display())
            })
        }
        None => Ok(CountryLookup::builtin()),
    }
}

/// Run fetch, analysis and reporting. Returns the exit code.
async fn run(args: &Args, config: &Config) -> Result<i32> {
    let start_time = Instant::now();
    let dataset_path = config.dataset_path();
    let countries = load_countries(config)?;

    let mut call_sign = config.station.call_sign.trim().to_ascii_uppercase();
    let mut fetched_window: Option<TimeWindow> = None;

    // Step 1: Fetch the window into the dataset file
    if args.skip_fetch {
        info!("Skipping fetch, using {}", dataset_path.display());
    } else {
        call_sign = config.call_sign()?;
        let window = TimeWindow::ending_at(Utc::now(), config.period()?)?;
        let client = WsprLiveClient::new(
            &config.fetch.base_url,
            Duration::from_secs(config.fetch.timeout_seconds),
        )?;

        if args.dry_run {
            return handle_dry_run(&client, &call_sign, &window, &dataset_path);
        }

        println!("📡 Fetching spots for {}", call_sign);
        println!("   Window: {}", window);

        let fetcher = Fetcher::new(client, dataset_path.clone(), countries.clone())
            .with_progress(!args.quiet);
        let outcome = fetcher.fetch(&call_sign, &window).await?;

        println!(
            "   Saved {} spots to {}",
            outcome.rows,
            outcome.path.display()
        );
        if outcome.out_of_window > 0 || outcome.unreadable > 0 {
            println!(
                "   Dropped {} rows outside the window, {} unreadable",
                outcome.out_of_window, outcome.unreadable
            );
        }
        fetched_window = Some(window);
    }

    // Step 2: Load and analyse
    println!("\n🔬 Analysing {}", dataset_path.display());

    let dataset = dataset::load_dataset(&dataset_path, &countries)
        .with_context(|| format!("Failed to load dataset {}", dataset_path.display()))?;
    let options = AnalysisOptions::from(&config.analysis);
    let metrics = analysis::analyse(&dataset, &options)?;

    // Step 3: Build and save the report
    let span = dataset.time_span();
    let report = AnalysisReport {
        metadata: ReportMetadata {
            call_sign,
            window_start: fetched_window.map(|w| w.start),
            window_end: fetched_window.map(|w| w.end()),
            first_spot: span.map(|(first, _)| first),
            last_spot: span.map(|(_, last)| last),
            generated_at: Utc::now(),
            data_file: dataset_path.display().to_string(),
        },
        metrics,
    };

    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report),
    };

    std::fs::write(&args.output, &output)
        .with_context(|| format!("Failed to write report to {}", args.output.display()))?;

    if config.storage.export_tables {
        let files = report::export_tables(&report.metrics, &config.storage.data_dir)
            .context("Failed to export tables")?;
        println!(
            "   Exported {} tables to {}",
            files.len(),
            config.storage.data_dir.display()
        );
    }

    print_summary(&report.metrics, start_time.elapsed().as_secs_f64());
    println!(
        "\n✅ Analysis complete! Report saved to: {}",
        args.output.display()
    );

    Ok(0)
}

/// Handle --dry-run: print the request that would be made, exit.
fn handle_dry_run(
    client: &WsprLiveClient,
    call_sign: &str,
    window: &TimeWindow,
    dataset_path: &Path,
) -> Result<i32> {
    println!("\n🔍 Dry run: no request will be made.\n");
    println!("   Call sign: {}", call_sign);
    println!("   Window:    {}", window);
    println!("   URL:       {}", client.query_url(call_sign, window)?);
    println!("   Dataset:   {}", dataset_path.display());
    println!("\n✅ Dry run complete.");
    Ok(0)
}

/// Print the headline figures to the console.
fn print_summary(metrics: &MetricsSummary, duration: f64) {
    let counts = &metrics.counts;

    println!("\n📊 Analysis Summary:");
    println!(
        "   Spots: {} valid, {} skipped | Unique spots: {} | Reporters: {} | Grids: {}",
        counts.valid_rows,
        counts.skipped_rows,
        counts.unique_spots,
        counts.unique_reporters,
        counts.unique_grids
    );
    if let Some(furthest) = metrics.furthest.first() {
        println!(
            "   Furthest: {} ({}) at {:.0} km",
            furthest.reporter_call, furthest.reporter_grid, furthest.distance_km
        );
    }
    if let Some(top) = metrics.top_call_signs.first() {
        println!("   Most spots: {} ({})", top.call_sign, top.count);
    }
    println!("   Countries: {}", metrics.countries.len());
    println!("   Duration: {:.1}s", duration);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let no_rows = anyhow::Error::from(AnalyticsError::NoRows {
            call_sign: "2E0IJC".to_string(),
        });
        assert_eq!(exit_code_for(&no_rows), 2);

        let empty = anyhow::Error::from(AnalyticsError::EmptyDataset { skipped: 4 })
            .context("analysis failed");
        assert_eq!(exit_code_for(&empty), 2);

        let retrieval = anyhow::Error::from(AnalyticsError::Retrieval("timeout".to_string()));
        assert_eq!(exit_code_for(&retrieval), 1);

        assert_eq!(exit_code_for(&anyhow::anyhow!("other")), 1);
    }

    #[test]
    fn test_load_config_applies_args() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("custom.toml");
        std::fs::write(&path, "[analysis]\ntop_n = 3\n").unwrap();

        let mut args = cli::tests::make_args();
        args.config = Some(path);
        args.bin_width = Some(1000.0);

        let config = load_config(&args).unwrap();
        assert_eq!(config.analysis.top_n, 3);
        assert_eq!(config.analysis.bin_width_km, 1000.0);
        assert_eq!(config.station.call_sign, "2E0IJC");
    }

    #[test]
    fn test_load_config_rejects_invalid_values() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("custom.toml");
        std::fs::write(&path, "[analysis]\ntop_n = 0\n").unwrap();

        let mut args = cli::tests::make_args();
        args.config = Some(path);
        assert!(load_config(&args).is_err());
    }

    #[test]
    fn test_handle_config_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("wspr.toml");

        let mut args = cli::tests::make_args();
        args.config = Some(path.clone());
        args.init_config = true;
        handle_config_file(&args).unwrap();
        let created: Config = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(created.analysis.top_n, 10);

        std::fs::write(&path, "[analysis]\ntop_n = 99\n").unwrap();
        args.init_config = false;
        args.reset_config = true;
        handle_config_file(&args).unwrap();
        let reset: Config = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(reset.analysis.top_n, 10);
    }

    #[test]
    fn test_skip_fetch_pipeline() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let mut config = Config::default();
        config.storage.data_dir = temp_dir.path().to_path_buf();
        config.storage.export_tables = true;
        std::fs::write(
            config.dataset_path(),
            "timestamp,reporter_call,reporter_grid,transmitter_call,transmitter_grid,frequency,snr,distance,country\n\
             2025-08-19 05:10:00,AB1CD,FN42,2E0IJC,IO91,14097063,-20,100,US\n\
             2025-08-19 14:00:00,XY9Z,FN03,2E0IJC,IO91,14097063,-5,50,CA\n",
        )
        .unwrap();

        let mut args = cli::tests::make_args();
        args.skip_fetch = true;
        args.format = OutputFormat::Json;
        args.output = temp_dir.path().join("report.json");

        let code = tokio_test::block_on(run(&args, &config)).unwrap();
        assert_eq!(code, 0);

        let json = std::fs::read_to_string(&args.output).unwrap();
        let report: AnalysisReport = serde_json::from_str(&json).unwrap();
        assert_eq!(report.metrics.counts.valid_rows, 2);
        assert!(report.metadata.window_start.is_none());
        assert!(temp_dir.path().join("wspr_summary.csv").exists());
    }

    #[test]
    fn test_skip_fetch_with_empty_dataset_is_no_data() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let mut config = Config::default();
        config.storage.data_dir = temp_dir.path().to_path_buf();
        std::fs::write(
            config.dataset_path(),
            "timestamp,reporter_call,transmitter_call,distance\nlater,K1ABC,2E0IJC,10\n",
        )
        .unwrap();

        let mut args = cli::tests::make_args();
        args.skip_fetch = true;
        args.output = temp_dir.path().join("report.md");

        let err = tokio_test::block_on(run(&args, &config)).unwrap_err();
        assert_eq!(exit_code_for(&err), 2);
        assert!(!args.output.exists());
    }
}
