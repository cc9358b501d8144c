use analytics::MetricsEngine;
use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use comfy_table::Table;
use comfy_table::presets::UTF8_FULL;
use configuration::{Config, DataSourceKind, LoggingSettings, load_config, logging};
use database::DbRepository;
use exporter::{ReportExporter, print_summary};
use index_engine::{InMemoryPriceStore, IndexPipeline};
use market_data::{
    CsvDirectorySource, MarketDataSource, UniverseFetch, fetch_universe, normalize_symbol,
};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::prelude::*;
use uuid::Uuid;

/// The main entry point for the index tracker.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    // Configuration errors are fatal before anything else happens.
    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;

    // The guard flushes the log file on exit.
    let _log_guard = init_tracing(&config.logging)?;

    // Execute the appropriate command
    match cli.command {
        Commands::Run(args) => handle_run(config, args).await,
        Commands::Ingest => handle_ingest(config).await,
        Commands::CheckConfig => {
            print_config(&config);
            Ok(())
        }
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Builds an equal-weighted index of the largest stocks by market cap.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Calculate the index over the configured date range and export the report.
    Run(RunArgs),
    /// Load the CSV price history into PostgreSQL.
    Ingest,
    /// Validate the configuration and print the effective settings.
    CheckConfig,
}

#[derive(Parser)]
struct RunArgs {
    /// Where to read prices from. Defaults to `data.source`.
    #[arg(long, value_enum)]
    source: Option<DataSourceKind>,

    /// Also save the run to the database.
    #[arg(long)]
    persist: bool,

    /// Output directory. Defaults to `output.directory`.
    #[arg(long)]
    output: Option<PathBuf>,
}

// ==============================================================================
// Tracing
// ==============================================================================

/// Logs go to stderr through the progress-bar layer and to a daily log file.
fn init_tracing(settings: &LoggingSettings) -> anyhow::Result<WorkerGuard> {
    let filter = logging::env_filter(settings)?;
    let (file_writer, guard) = logging::file_writer(settings)?;
    let indicatif_layer = IndicatifLayer::new();

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(indicatif_layer.get_stderr_writer()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .with(indicatif_layer)
        .init();

    Ok(guard)
}

// ==============================================================================
// Run Command Logic
// ==============================================================================

/// Loads prices, runs the pipeline, computes metrics and exports everything.
async fn handle_run(config: Config, args: RunArgs) -> anyhow::Result<()> {
    let index = &config.index;
    let source = args.source.unwrap_or(config.data.source);
    tracing::info!(
        inception = %index.inception_date,
        end = %index.end_date,
        constituents = index.constituent_count,
        ?source,
        "Starting index run"
    );

    // 1. Fully materialize the price store before the engine starts.
    let store = match source {
        DataSourceKind::Csv => {
            let fetch = fetch_csv_universe(&config).await?;
            fetch.into_store()?
        }
        DataSourceKind::Database => {
            let repo = connect_repository().await?;
            let observations = repo
                .get_observations_by_date_range(index.inception_date, index.end_date)
                .await?;
            InMemoryPriceStore::from_observations(observations)?
        }
    };
    tracing::info!(
        observations = store.observation_count(),
        symbols = store.symbols().len(),
        "Price store ready"
    );

    // 2. Calculate the index.
    let run = IndexPipeline::from_settings(index)
        .run(&store)
        .context("Index calculation failed")?;

    // 3. Derive the summary metrics.
    let metrics =
        MetricsEngine::new(index.risk_free_rate).calculate(&run.points, &run.rebalance_events());

    // 4. Export.
    let output_dir = args.output.unwrap_or_else(|| config.output.directory.clone());
    let files = ReportExporter::new(&output_dir)
        .export(&run, &metrics)
        .with_context(|| format!("Failed to export the report to {}", output_dir.display()))?;
    for path in files.all() {
        tracing::info!("Wrote {}", path.display());
    }

    // 5. Optionally archive the run.
    if args.persist {
        let repo = connect_repository().await?;
        let run_id = Uuid::new_v4();
        repo.save_index_run(
            run_id,
            index.inception_date,
            index.end_date,
            index.constituent_count,
            &run,
            &metrics,
        )
        .await?;
        tracing::info!(%run_id, "Run saved to the database");
    }

    print_summary(&run, &metrics);
    Ok(())
}

// ==============================================================================
// Ingest Command Logic
// ==============================================================================

async fn handle_ingest(config: Config) -> anyhow::Result<()> {
    let fetch = fetch_csv_universe(&config).await?;
    let repo = connect_repository().await?;
    let inserted = repo.save_price_observations(&fetch.observations).await?;

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Ingest", "Count"]);
    table.add_row(vec!["Symbols fetched".to_string(), fetch.succeeded.len().to_string()]);
    table.add_row(vec!["Symbols failed".to_string(), fetch.failed.len().to_string()]);
    table.add_row(vec!["Rows read".to_string(), fetch.observations.len().to_string()]);
    table.add_row(vec!["Rows inserted".to_string(), inserted.to_string()]);
    println!("\n{table}");

    if !fetch.failed.is_empty() {
        println!("Failed symbols: {}", fetch.failed_symbols().join(", "));
    }
    Ok(())
}

// ==============================================================================
// Helpers
// ==============================================================================

/// Fetches the configured universe (or every file in the directory) from CSV.
async fn fetch_csv_universe(config: &Config) -> anyhow::Result<UniverseFetch> {
    let source = CsvDirectorySource::new(&config.data.csv_directory);
    let symbols = if config.data.symbols.is_empty() {
        source.list_symbols().await.with_context(|| {
            format!(
                "Failed to list symbols in {}",
                config.data.csv_directory.display()
            )
        })?
    } else {
        config
            .data
            .symbols
            .iter()
            .map(|s| normalize_symbol(s))
            .collect()
    };

    let (start, end): (NaiveDate, NaiveDate) = (config.index.inception_date, config.index.end_date);
    let fetch = fetch_universe(&source, &symbols, start, end, config.data.max_concurrency).await?;
    Ok(fetch)
}

async fn connect_repository() -> anyhow::Result<DbRepository> {
    let pool = database::connect()
        .await
        .context("Failed to connect to the database")?;
    database::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    Ok(DbRepository::new(pool))
}

fn print_config(config: &Config) {
    let index = &config.index;
    let holidays = if index.holidays.is_empty() {
        "none".to_string()
    } else {
        index
            .holidays
            .iter()
            .map(NaiveDate::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    };
    let symbols = if config.data.symbols.is_empty() {
        format!("all files in {}", config.data.csv_directory.display())
    } else {
        config.data.symbols.join(", ")
    };

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["Setting", "Value"]);
    let rows = [
        ("index.constituent_count", index.constituent_count.to_string()),
        ("index.inception_date", index.inception_date.to_string()),
        ("index.end_date", index.end_date.to_string()),
        ("index.base_value", index.base_value.to_string()),
        ("index.risk_free_rate", index.risk_free_rate.to_string()),
        ("index.trading_calendar", format!("{:?}", index.trading_calendar)),
        ("index.holidays", holidays),
        ("index.shortfall_policy", format!("{:?}", index.shortfall_policy)),
        ("index.reset_policy", format!("{:?}", index.reset_policy)),
        ("data.source", format!("{:?}", config.data.source)),
        ("data.symbols", symbols),
        ("data.max_concurrency", config.data.max_concurrency.to_string()),
        ("output.directory", config.output.directory.display().to_string()),
        ("logging.level", config.logging.level.clone()),
    ];
    for (key, value) in rows {
        table.add_row(vec![key.to_string(), value]);
    }
    println!("Configuration is valid.\n{table}");
}
