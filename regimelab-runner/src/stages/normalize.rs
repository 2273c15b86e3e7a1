//! Normalization stage: normalized cache → cleaned cache.
//!
//! Reads every normalized part for the requested symbols, runs the quality
//! pipeline (dedupe, validate, flag outliers, align to the shared calendar)
//! and upserts the result. No source rows is not an error here: the run
//! still writes its report, with a warning.

use chrono::{DateTime, Utc};
use regimelab_core::data::{run_quality, QualitySummary};
use regimelab_core::domain::{normalize_symbols, CleanedRow};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

use crate::config::QualityConfig;
use crate::env::StageEnv;
use crate::error::StageError;
use crate::report::{write_report, NORMALIZATION_REPORT_FILE};

/// Outcome of one normalization run. Serialized flat as the stage report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationRunResult {
    pub run_id: String,
    pub generated_at_utc: DateTime<Utc>,
    pub symbols: Vec<String>,
    #[serde(flatten)]
    pub quality: QualitySummary,
    pub cleaned_files: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_file: Option<PathBuf>,
}

pub fn normalize_daily_cache<S: AsRef<str>>(
    symbols: &[S],
    config: &QualityConfig,
    env: &StageEnv,
    run_id: Option<&str>,
) -> Result<NormalizationRunResult, StageError> {
    let symbols = normalize_symbols(symbols)?;
    let run_id = env.run_id(run_id);
    let generated_at_utc = env.clock.now_utc();
    info!(%run_id, symbols = symbols.len(), "normalization started");

    let source: Vec<CleanedRow> = env.store(&config.source_dir).read(&symbols)?;
    let (cleaned, quality) = run_quality(source, &symbols, config.outlier_return_threshold);

    let cleaned_files = env
        .store(&config.cleaned_dir)
        .write(&cleaned, config.write_mode, env.clock.now_utc())?;

    let mut result = NormalizationRunResult {
        run_id,
        generated_at_utc,
        symbols,
        quality,
        cleaned_files,
        report_file: None,
    };
    let path = write_report(
        &env.resolve(&config.report_dir),
        &result.run_id,
        NORMALIZATION_REPORT_FILE,
        &result,
    )?;
    result.report_file = Some(path);

    info!(
        run_id = %result.run_id,
        source_rows = result.quality.source_rows,
        aligned_rows = result.quality.aligned_rows,
        missing_bar_rows = result.quality.missing_bar_rows,
        "normalization finished"
    );
    Ok(result)
}
