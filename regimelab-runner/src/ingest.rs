//! Ingestion stage: bar source → raw and normalized caches.
//!
//! Policy:
//! 1. Symbols are normalized; an empty list aborts the run.
//! 2. Each symbol is requested with retries. A symbol with no usable raw bars,
//!    or whose primary request never succeeds, is recorded as a failure and
//!    the run moves on.
//! 3. The adjusted-close request is best effort: its failure only downgrades
//!    the symbol to close-as-adj_close with a warning.
//! 4. Raw and normalized rows share one pull timestamp and are appended.
//! 5. `metadata.json` is written for every run, including all-failed ones.

use chrono::{DateTime, Utc};
use regimelab_core::data::{
    bars_to_rows, normalize, BarSource, BrokerError, DataError, HistoricalRequest, WriteMode,
};
use regimelab_core::domain::{normalize_symbols, AdjustmentMethod, Bar, NormalizedRow, Provenance};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::config::IngestionConfig;
use crate::env::StageEnv;
use crate::error::{StageError, SymbolError};
use crate::report::{write_report, METADATA_FILE};
use crate::retry::with_retries;

/// Outcome for one successfully ingested symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolIngestionResult {
    pub symbol: String,
    pub row_count: usize,
    pub adjustment_method: AdjustmentMethod,
    pub raw_files: Vec<PathBuf>,
    pub normalized_files: Vec<PathBuf>,
    pub warnings: Vec<String>,
    /// BLAKE3 of the normalized rows as JSON.
    pub data_hash: String,
}

/// Outcome of one ingestion run. Also the `metadata.json` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionRunResult {
    pub run_id: String,
    pub generated_at_utc: DateTime<Utc>,
    /// Normalized symbols of the request.
    pub symbols: Vec<String>,
    pub symbols_requested: usize,
    pub symbols_succeeded: usize,
    pub symbols_failed: usize,
    pub succeeded_symbols: Vec<String>,
    pub failed_symbols: Vec<String>,
    pub results: Vec<SymbolIngestionResult>,
    /// Symbol → error message.
    pub failures: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_file: Option<PathBuf>,
}

impl IngestionRunResult {
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Pull daily bars for `symbols` and append them to the raw and normalized caches.
pub fn ingest_daily_bars<S: AsRef<str>>(
    source: &mut dyn BarSource,
    symbols: &[S],
    config: &IngestionConfig,
    env: &StageEnv,
    run_id: Option<&str>,
) -> Result<IngestionRunResult, StageError> {
    let symbols = normalize_symbols(symbols)?;
    let run_id = env.run_id(run_id);
    let generated_at_utc = env.clock.now_utc();
    info!(%run_id, symbols = symbols.len(), source = source.name(), "ingestion started");

    let connected_here = if config.auto_connect && !source.is_connected() {
        source.connect().map_err(StageError::Connect)?;
        true
    } else {
        false
    };

    let throttle = config.throttle();
    let mut results = Vec::new();
    let mut failures = BTreeMap::new();
    for (i, symbol) in symbols.iter().enumerate() {
        if i > 0 && !throttle.is_zero() {
            std::thread::sleep(throttle);
        }
        match ingest_symbol(source, symbol, config, env) {
            Ok(result) => {
                info!(
                    %symbol,
                    rows = result.row_count,
                    method = %result.adjustment_method,
                    "symbol ingested"
                );
                results.push(result);
            }
            Err(e) => {
                warn!(%symbol, error = %e, "symbol ingestion failed");
                failures.insert(symbol.clone(), e.to_string());
            }
        }
    }

    if connected_here {
        source.disconnect();
    }

    let mut run = IngestionRunResult {
        run_id,
        generated_at_utc,
        symbols_requested: symbols.len(),
        symbols_succeeded: results.len(),
        symbols_failed: failures.len(),
        succeeded_symbols: results.iter().map(|r| r.symbol.clone()).collect(),
        failed_symbols: failures.keys().cloned().collect(),
        symbols,
        results,
        failures,
        metadata_file: None,
    };
    let path = write_report(
        &env.resolve(&config.run_metadata_dir),
        &run.run_id,
        METADATA_FILE,
        &run,
    )?;
    run.metadata_file = Some(path);

    info!(
        run_id = %run.run_id,
        succeeded = run.symbols_succeeded,
        failed = run.symbols_failed,
        "ingestion finished"
    );
    Ok(run)
}

fn request(symbol: &str, what_to_show: &str, config: &IngestionConfig) -> HistoricalRequest {
    HistoricalRequest {
        symbol: symbol.to_string(),
        exchange: config.exchange.clone(),
        currency: config.currency.clone(),
        end_datetime: config.end_datetime.clone(),
        duration: config.duration.clone(),
        bar_size: config.bar_size.clone(),
        what_to_show: what_to_show.to_string(),
        use_rth: config.use_rth,
        format_date: config.format_date,
    }
}

fn fetch(
    source: &mut dyn BarSource,
    request: &HistoricalRequest,
    config: &IngestionConfig,
) -> Result<Vec<Bar>, SymbolError> {
    let label = format!("{} {}", request.symbol, request.what_to_show);
    with_retries(&config.retry_policy(), &label, |_| {
        source.request_historical_data(request)
    })
    .map_err(|e| SymbolError::RetriesExhausted {
        attempts: e.attempts,
        last: e.last,
    })
}

fn ingest_symbol(
    source: &mut dyn BarSource,
    symbol: &str,
    config: &IngestionConfig,
    env: &StageEnv,
) -> Result<SymbolIngestionResult, SymbolError> {
    let no_bars = || SymbolError::NoRawBars {
        symbol: symbol.to_string(),
    };

    let raw_bars = fetch(source, &request(symbol, &config.what_to_show_raw, config), config)?;
    if raw_bars.is_empty() {
        return Err(no_bars());
    }

    let provenance = Provenance {
        source: source.name().to_string(),
        exchange: config.exchange.clone(),
        currency: config.currency.clone(),
        what_to_show: config.what_to_show_raw.clone(),
        pulled_at_utc: env.clock.now_utc(),
    };
    let raw_rows = bars_to_rows(symbol, &raw_bars, &provenance);
    if raw_rows.is_empty() {
        return Err(no_bars());
    }

    let adjusted: Result<Vec<Bar>, BrokerError> =
        fetch(source, &request(symbol, &config.what_to_show_adjusted, config), config).map_err(
            |e| match e {
                SymbolError::RetriesExhausted { last, .. } => last,
                other => BrokerError::Connection(other.to_string()),
            },
        );
    let normalization = normalize(symbol, &raw_rows, adjusted.as_deref());
    for warning in &normalization.warnings {
        warn!(%symbol, "{warning}");
    }

    let written_at = env.clock.now_utc();
    let raw_files = env
        .store(&config.raw_cache_dir)
        .write(&raw_rows, WriteMode::Append, written_at)?;
    let normalized_files = env
        .store(&config.normalized_cache_dir)
        .write(&normalization.rows, WriteMode::Append, written_at)?;

    Ok(SymbolIngestionResult {
        symbol: symbol.to_string(),
        row_count: normalization.rows.len(),
        adjustment_method: normalization.method,
        raw_files,
        normalized_files,
        data_hash: data_hash(&normalization.rows)?,
        warnings: normalization.warnings,
    })
}

fn data_hash(rows: &[NormalizedRow]) -> Result<String, DataError> {
    let json = serde_json::to_vec(rows)
        .map_err(|e| DataError::CacheError(format!("failed to serialize rows for hashing: {e}")))?;
    Ok(blake3::hash(&json).to_hex().to_string())
}
