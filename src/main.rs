use analytics::{AssetResult, EventStudyEngine, EventStudyReport, SplitPanel, StudyParameters};
use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use configuration::settings::Config;
use configuration::{DataSource, LoggingConfig, StudyConfig};
use core_types::PriceSeries;
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use market_data::{CsvPriceSource, PriceSource, YahooClient};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

mod output;

/// The main entry point for the event-study application.
#[tokio::main]
async fn main() -> Result<()> {
    // Load RUST_LOG and EVENT_STUDY__* overrides from a .env file, if any.
    dotenvy::dotenv().ok();

    // Parse command-line arguments
    let cli = Cli::parse();

    // Execute the appropriate command
    match cli.command {
        Commands::Run(args) => handle_run(args).await,
        Commands::Validate(args) => handle_validate(args),
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Measures abnormal returns around a dated event with the market model.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch prices, run the study and print the results.
    Run(RunArgs),
    /// Load and check a configuration file without fetching anything.
    Validate(ValidateArgs),
}

#[derive(Parser)]
struct RunArgs {
    /// Path to the study configuration.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Overrides `data.source` from the configuration.
    #[arg(long, value_enum)]
    source: Option<DataSource>,

    /// Also write the full report as JSON to this file.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Parser)]
struct ValidateArgs {
    /// Path to the study configuration.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,
}

// ==============================================================================
// Logging
// ==============================================================================

/// Installs the global subscriber. `RUST_LOG` wins over `logging.level`.
///
/// The returned guard flushes the file writer and must live until exit.
fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .with_context(|| format!("invalid log level '{}'", config.level))?;

    let (file_layer, guard) = match &config.directory {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, &config.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .context("failed to install the tracing subscriber")?;

    Ok(guard)
}

// ==============================================================================
// Validate Command Logic
// ==============================================================================

fn load(path: &Path) -> Result<Config> {
    configuration::load_config_from(path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))
}

fn handle_validate(args: ValidateArgs) -> Result<()> {
    let config = load(&args.config)?;
    let study = &config.study;
    println!("{} is valid.", args.config.display());
    println!("  market:      {}", study.market_ticker);
    println!("  assets:      {}", study.asset_tickers.join(", "));
    println!("  comparisons: {}", study.comparison_pairs().len());
    println!(
        "  data:        {:?} from {} to {}",
        config.data.source, config.data.start_date, config.data.end_date
    );
    Ok(())
}

// ==============================================================================
// Run Command Logic
// ==============================================================================

/// Handles the orchestration of a full study run.
async fn handle_run(args: RunArgs) -> Result<()> {
    let mut config = load(&args.config)?;
    if let Some(source) = args.source {
        config.data.source = source;
        config.validate().context("invalid configuration after --source override")?;
    }
    let _guard = init_logging(&config.logging)?;

    let source = build_source(&config)?;
    let prices = fetch_all(
        source,
        config.study.all_tickers(),
        config.data.start_date,
        config.data.end_date,
    )
    .await?;
    let (market, assets) = prices
        .split_first()
        .ok_or_else(|| anyhow!("no market prices were fetched"))?;

    let engine = EventStudyEngine::new(study_parameters(&config.study));
    let split = Arc::new(
        engine
            .prepare(market, assets)
            .context("failed to align and split the return panel")?,
    );
    tracing::info!(
        estimation_rows = split.estimation.len(),
        event_rows = split.event.len(),
        "Prepared study windows."
    );

    let results = analyze_all(&engine, split.clone(), &config.study.asset_tickers).await?;
    let report = engine
        .assemble(&split, results, &config.study.comparison_pairs())
        .context("failed to run the pairwise tests")?;

    output::print_report(&report);

    if let Some(path) = &args.output {
        write_report(&report, path)?;
        println!("\nReport written to {}", path.display());
    }
    Ok(())
}

fn study_parameters(study: &StudyConfig) -> StudyParameters {
    StudyParameters::new(study.estimation, study.event)
        .with_gap(study.gap)
        .with_variance_convention(study.variance_convention)
        .with_difference_variance(study.difference_variance)
        .with_min_panel_rows(study.min_panel_rows)
}

fn build_source(config: &Config) -> Result<Arc<dyn PriceSource>> {
    match config.data.source {
        DataSource::Csv => {
            let path = config
                .data
                .csv_path
                .as_ref()
                .ok_or_else(|| anyhow!("data.csv_path is required for the csv source"))?;
            Ok(Arc::new(CsvPriceSource::new(path)))
        }
        DataSource::Yahoo => Ok(Arc::new(YahooClient::new(
            config.data.yahoo_base_url.as_deref(),
        )?)),
    }
}

/// Fetches every ticker concurrently, preserving the order of `tickers`.
async fn fetch_all(
    source: Arc<dyn PriceSource>,
    tickers: Vec<String>,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<PriceSeries>> {
    // Set up the progress bar
    let progress_bar = ProgressBar::new(tickers.len() as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    // Create concurrent tasks for each ticker
    let tasks: Vec<_> = tickers
        .into_iter()
        .map(|ticker| {
            let source = source.clone();
            let pb = progress_bar.clone();
            tokio::spawn(async move {
                pb.set_message(format!("Fetching {ticker}..."));
                let series = source
                    .fetch_prices(&ticker, start, end)
                    .await
                    .with_context(|| format!("failed to fetch prices for {ticker}"))?;
                pb.inc(1);
                tracing::debug!(%ticker, rows = series.len(), "Fetched prices.");
                Ok::<PriceSeries, anyhow::Error>(series)
            })
        })
        .collect();

    // Wait for all concurrent tasks to complete
    let results = join_all(tasks).await;
    progress_bar.finish_with_message("Prices fetched.");

    results
        .into_iter()
        .map(|joined| joined.context("a fetch task panicked")?)
        .collect()
}

/// Runs the per-asset pipeline for every asset on the blocking pool.
async fn analyze_all(
    engine: &EventStudyEngine,
    split: Arc<SplitPanel>,
    tickers: &[String],
) -> Result<Vec<AssetResult>> {
    let tasks: Vec<_> = tickers
        .iter()
        .cloned()
        .map(|ticker| {
            let engine = engine.clone();
            let split = split.clone();
            tokio::task::spawn_blocking(move || {
                engine
                    .analyze_asset(&split, &ticker)
                    .with_context(|| format!("failed to analyse {ticker}"))
            })
        })
        .collect();

    join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.context("an analysis task panicked")?)
        .collect()
}

fn write_report(report: &EventStudyReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}
