//! RegimeLab CLI: run the daily-bar pipeline stage by stage or end to end.
//!
//! Commands:
//! - `ingest`: pull bars from a CSV bar directory into the raw and normalized caches
//! - `normalize`: quality-check the normalized cache into the cleaned cache
//! - `indicators`: compute the feature cache
//! - `regime`: apply the benchmark regime filter
//! - `trend`: apply the trend eligibility filter
//! - `all`: every stage in order under one run id

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use regimelab_runner::{
    apply_market_regime_filter, apply_trend_eligibility_filter, compute_indicators,
    ingest_daily_bars, normalize_daily_cache, CsvBarSource, IngestionRunResult, PipelineConfig,
    StageEnv,
};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser)]
#[command(
    name = "regimelab",
    about = "RegimeLab CLI: partitioned daily-bar cache, indicators and regime/trend signals"
)]
struct Cli {
    /// Pipeline config (TOML). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory the cache and report paths are relative to.
    #[arg(long, global = true, default_value = ".")]
    base_dir: PathBuf,

    /// Run identifier. Generated when omitted.
    #[arg(long, global = true)]
    run_id: Option<String>,

    /// Symbols to process. Falls back to `symbols` in the config file.
    #[arg(long, global = true, num_args = 1.., value_delimiter = ',')]
    symbols: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pull daily bars into the raw and normalized caches.
    Ingest {
        /// Directory of `<SYMBOL>_<WHAT_TO_SHOW>.csv` bar files.
        #[arg(long)]
        csv_dir: PathBuf,
    },
    /// Run the data-quality stage into the cleaned cache.
    Normalize,
    /// Compute indicators into the feature cache.
    Indicators,
    /// Apply the market regime filter.
    Regime {
        /// Override the configured benchmark symbol.
        #[arg(long)]
        benchmark: Option<String>,
    },
    /// Apply the trend eligibility filter.
    Trend,
    /// Run every stage in order.
    All {
        /// Directory of `<SYMBOL>_<WHAT_TO_SHOW>.csv` bar files.
        #[arg(long)]
        csv_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    let symbols = if cli.symbols.is_empty() {
        config.symbols.clone()
    } else {
        cli.symbols.clone()
    };
    if symbols.is_empty() {
        bail!("no symbols given; pass --symbols or set `symbols` in the config");
    }

    let env = StageEnv::new(&cli.base_dir);
    let run_id = env.run_id(cli.run_id.as_deref());
    let run_id = Some(run_id.as_str());

    match cli.command {
        Commands::Ingest { csv_dir } => {
            let run = run_ingest(&csv_dir, &symbols, &config, &env, run_id)?;
            exit_on_failures(&run);
        }
        Commands::Normalize => {
            print_json(&normalize_daily_cache(&symbols, &config.quality, &env, run_id)?)?;
        }
        Commands::Indicators => {
            print_json(&compute_indicators(&symbols, &config.indicators, &env, run_id)?)?;
        }
        Commands::Regime { benchmark } => {
            if let Some(benchmark) = benchmark {
                config.regime.benchmark_symbol = benchmark;
            }
            print_json(&apply_market_regime_filter(&symbols, &config.regime, &env, run_id)?)?;
        }
        Commands::Trend => {
            print_json(&apply_trend_eligibility_filter(&symbols, &config.trend, &env, run_id)?)?;
        }
        Commands::All { csv_dir } => {
            let ingest = run_ingest(&csv_dir, &symbols, &config, &env, run_id)?;
            print_json(&normalize_daily_cache(&symbols, &config.quality, &env, run_id)?)?;
            print_json(&compute_indicators(&symbols, &config.indicators, &env, run_id)?)?;
            print_json(&apply_market_regime_filter(&symbols, &config.regime, &env, run_id)?)?;
            print_json(&apply_trend_eligibility_filter(&symbols, &config.trend, &env, run_id)?)?;
            exit_on_failures(&ingest);
        }
    }
    Ok(())
}

fn run_ingest(
    csv_dir: &std::path::Path,
    symbols: &[String],
    config: &PipelineConfig,
    env: &StageEnv,
    run_id: Option<&str>,
) -> Result<IngestionRunResult> {
    let mut source = CsvBarSource::new(csv_dir);
    let run = ingest_daily_bars(&mut source, symbols, &config.ingestion, env, run_id)?;
    print_json(&run)?;
    info!(
        run_id = %run.run_id,
        succeeded = run.symbols_succeeded,
        failed = run.symbols_failed,
        "ingestion complete"
    );
    Ok(run)
}

fn exit_on_failures(run: &IngestionRunResult) {
    if !run.all_succeeded() {
        for (symbol, err) in &run.failures {
            error!(%symbol, "{err}");
        }
        std::process::exit(1);
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize run result")?;
    println!("{json}");
    Ok(())
}
