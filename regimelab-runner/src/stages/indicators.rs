//! Indicator stage: cleaned cache → feature cache.

use chrono::{DateTime, Utc};
use regimelab_core::data::{dedupe_latest, DataError};
use regimelab_core::domain::{normalize_symbols, CleanedRow};
use regimelab_core::indicators::{compute_features, IndicatorConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

use crate::config::IndicatorsConfig;
use crate::env::StageEnv;
use crate::error::StageError;
use crate::report::{write_report, INDICATORS_REPORT_FILE};

/// Outcome of one indicator run. Serialized flat as the stage report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRunResult {
    pub run_id: String,
    pub generated_at_utc: DateTime<Utc>,
    pub symbols: Vec<String>,
    pub total_rows: usize,
    pub indicator_ready_rows: usize,
    pub config: IndicatorConfig,
    pub feature_files: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_file: Option<PathBuf>,
}

/// Compute features for `symbols` from the freshest cleaned row per date.
///
/// Fails with `NoSourceRows` when the cleaned cache has nothing for them.
pub fn compute_indicators<S: AsRef<str>>(
    symbols: &[S],
    config: &IndicatorsConfig,
    env: &StageEnv,
    run_id: Option<&str>,
) -> Result<IndicatorRunResult, StageError> {
    let symbols = normalize_symbols(symbols)?;
    let run_id = env.run_id(run_id);
    let generated_at_utc = env.clock.now_utc();
    info!(%run_id, symbols = symbols.len(), "indicator computation started");

    let cleaned: Vec<CleanedRow> = env.store(&config.source_dir).read(&symbols)?;
    if cleaned.is_empty() {
        return Err(DataError::NoSourceRows {
            stage: "cleaned".into(),
        }
        .into());
    }

    let features = compute_features(dedupe_latest(cleaned), &config.periods);
    let total_rows = features.len();
    let indicator_ready_rows = features.iter().filter(|f| f.indicator_ready).count();

    let feature_files = env
        .store(&config.output_dir)
        .write(&features, config.write_mode, env.clock.now_utc())?;

    let mut result = IndicatorRunResult {
        run_id,
        generated_at_utc,
        symbols,
        total_rows,
        indicator_ready_rows,
        config: config.periods.clone(),
        feature_files,
        report_file: None,
    };
    let path = write_report(
        &env.resolve(&config.report_dir),
        &result.run_id,
        INDICATORS_REPORT_FILE,
        &result,
    )?;
    result.report_file = Some(path);

    info!(
        run_id = %result.run_id,
        total_rows,
        indicator_ready_rows,
        "indicator computation finished"
    );
    Ok(result)
}
