//! Run report export (JSON).
//!
//! Every stage writes one flat JSON object to
//! `<report_dir>/<run_id>/<file_name>`.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const METADATA_FILE: &str = "metadata.json";
pub const NORMALIZATION_REPORT_FILE: &str = "normalization_report.json";
pub const INDICATORS_REPORT_FILE: &str = "indicators_report.json";
pub const REGIME_REPORT_FILE: &str = "regime_report.json";
pub const TREND_REPORT_FILE: &str = "trend_report.json";

/// Directory holding one run's reports.
pub fn run_dir(report_root: &Path, run_id: &str) -> PathBuf {
    report_root.join(run_id)
}

/// Serialize `report` as pretty JSON into the run's directory.
pub fn write_report<T: Serialize>(
    report_root: &Path,
    run_id: &str,
    file_name: &str,
    report: &T,
) -> Result<PathBuf> {
    let dir = run_dir(report_root, run_id);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create report dir {}", dir.display()))?;

    let path = dir.join(file_name);
    let json = serde_json::to_string_pretty(report)
        .with_context(|| format!("Failed to serialize {file_name}"))?;
    std::fs::write(&path, json)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;
    Ok(path)
}
