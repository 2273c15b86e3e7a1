//! Regime stage: feature cache → regime signal cache.
//!
//! The benchmark is read alongside the requested symbols but only the
//! requested symbols are written. A benchmark with no feature rows aborts
//! the run before anything is written.

use chrono::{DateTime, Utc};
use regimelab_core::data::{dedupe_latest, DataError};
use regimelab_core::domain::{normalize_symbol, normalize_symbols, FeatureRow};
use regimelab_core::signals::{apply_regime, regime_table};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

use crate::config::RegimeConfig;
use crate::env::StageEnv;
use crate::error::StageError;
use crate::report::{write_report, REGIME_REPORT_FILE};

/// Outcome of one regime run. Serialized flat as the stage report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeRunResult {
    pub run_id: String,
    pub generated_at_utc: DateTime<Utc>,
    pub symbols: Vec<String>,
    pub benchmark_symbol: String,
    pub total_rows: usize,
    pub regime_known_rows: usize,
    pub regime_on_rows: usize,
    pub signal_files: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_file: Option<PathBuf>,
}

pub fn apply_market_regime_filter<S: AsRef<str>>(
    symbols: &[S],
    config: &RegimeConfig,
    env: &StageEnv,
    run_id: Option<&str>,
) -> Result<RegimeRunResult, StageError> {
    let symbols = normalize_symbols(symbols)?;
    let benchmark = normalize_symbol(&config.benchmark_symbol);
    let run_id = env.run_id(run_id);
    let generated_at_utc = env.clock.now_utc();
    info!(%run_id, symbols = symbols.len(), %benchmark, "regime filter started");

    let mut to_read = symbols.clone();
    if !to_read.contains(&benchmark) {
        to_read.push(benchmark.clone());
        to_read.sort();
    }
    let features: Vec<FeatureRow> = env.store(&config.source_dir).read(&to_read)?;
    if features.is_empty() {
        return Err(DataError::NoSourceRows {
            stage: "feature".into(),
        }
        .into());
    }

    let features = dedupe_latest(features);
    let table = regime_table(&features, &benchmark)?;
    let targets: Vec<FeatureRow> = features
        .into_iter()
        .filter(|f| symbols.binary_search(&f.base.symbol).is_ok())
        .collect();
    let signals = apply_regime(targets, &table, &benchmark);

    let total_rows = signals.len();
    let regime_known_rows = signals
        .iter()
        .filter(|s| s.regime.as_ref().is_some_and(|r| r.regime_known))
        .count();
    let regime_on_rows = signals
        .iter()
        .filter(|s| s.regime.as_ref().is_some_and(|r| r.regime_on))
        .count();

    let signal_files = env
        .store(&config.output_dir)
        .write(&signals, config.write_mode, env.clock.now_utc())?;

    let mut result = RegimeRunResult {
        run_id,
        generated_at_utc,
        symbols,
        benchmark_symbol: benchmark,
        total_rows,
        regime_known_rows,
        regime_on_rows,
        signal_files,
        report_file: None,
    };
    let path = write_report(
        &env.resolve(&config.report_dir),
        &result.run_id,
        REGIME_REPORT_FILE,
        &result,
    )?;
    result.report_file = Some(path);

    info!(
        run_id = %result.run_id,
        total_rows,
        regime_known_rows,
        regime_on_rows,
        "regime filter finished"
    );
    Ok(result)
}
