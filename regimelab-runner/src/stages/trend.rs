//! Trend stage: regime signal cache → trend signal cache.
//!
//! Regime annotations are carried through when the regime tree has rows for
//! the requested symbols. When it has none, the feature cache is read
//! instead so this stage can run before the regime filter ever has.

use chrono::{DateTime, Utc};
use regimelab_core::data::{dedupe_latest, DataError};
use regimelab_core::domain::{normalize_symbols, FeatureRow, SignalRow};
use regimelab_core::signals::apply_trend;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

use crate::config::TrendConfig;
use crate::env::StageEnv;
use crate::error::StageError;
use crate::report::{write_report, TREND_REPORT_FILE};

/// Outcome of one trend run. Serialized flat as the stage report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendRunResult {
    pub run_id: String,
    pub generated_at_utc: DateTime<Utc>,
    pub symbols: Vec<String>,
    /// True when rows came from the feature cache.
    pub used_fallback_source: bool,
    pub total_rows: usize,
    pub trend_known_rows: usize,
    pub trend_eligible_rows: usize,
    pub signal_files: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_file: Option<PathBuf>,
}

pub fn apply_trend_eligibility_filter<S: AsRef<str>>(
    symbols: &[S],
    config: &TrendConfig,
    env: &StageEnv,
    run_id: Option<&str>,
) -> Result<TrendRunResult, StageError> {
    let symbols = normalize_symbols(symbols)?;
    let run_id = env.run_id(run_id);
    let generated_at_utc = env.clock.now_utc();
    info!(%run_id, symbols = symbols.len(), "trend filter started");

    let mut rows: Vec<SignalRow> = env.store(&config.source_dir).read(&symbols)?;
    let used_fallback_source = rows.is_empty();
    if used_fallback_source {
        info!(source = %config.fallback_source_dir, "no signal rows; reading features");
        let features: Vec<FeatureRow> = env.store(&config.fallback_source_dir).read(&symbols)?;
        rows = features.into_iter().map(SignalRow::from_feature).collect();
    }
    if rows.is_empty() {
        return Err(DataError::NoSourceRows {
            stage: "signal or feature".into(),
        }
        .into());
    }

    let signals = apply_trend(dedupe_latest(rows));
    let total_rows = signals.len();
    let trend_known_rows = signals
        .iter()
        .filter(|s| s.trend.is_some_and(|t| t.trend_known))
        .count();
    let trend_eligible_rows = signals
        .iter()
        .filter(|s| s.trend.is_some_and(|t| t.trend_eligible))
        .count();

    let signal_files = env
        .store(&config.output_dir)
        .write(&signals, config.write_mode, env.clock.now_utc())?;

    let mut result = TrendRunResult {
        run_id,
        generated_at_utc,
        symbols,
        used_fallback_source,
        total_rows,
        trend_known_rows,
        trend_eligible_rows,
        signal_files,
        report_file: None,
    };
    let path = write_report(
        &env.resolve(&config.report_dir),
        &result.run_id,
        TREND_REPORT_FILE,
        &result,
    )?;
    result.report_file = Some(path);

    info!(
        run_id = %result.run_id,
        total_rows,
        trend_known_rows,
        trend_eligible_rows,
        "trend filter finished"
    );
    Ok(result)
}
