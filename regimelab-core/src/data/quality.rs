//! Data-quality engine: dedupe, validate, flag outliers, align.
//!
//! The steps run in that order and each one reports what it removed or
//! flagged so the run report can account for every source row.

use super::align::align_to_calendar;
use crate::domain::{CleanedRow, Keyed};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Default absolute daily-return threshold for outlier flagging.
pub const DEFAULT_OUTLIER_THRESHOLD: f64 = 0.20;

pub const NO_SOURCE_ROWS_WARNING: &str = "No source rows found for requested symbols.";

/// Counters for one quality run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualitySummary {
    pub symbols_requested: usize,
    pub source_rows: usize,
    pub duplicate_rows_removed: usize,
    pub invalid_rows_removed: usize,
    pub outlier_rows_flagged: usize,
    pub aligned_rows: usize,
    pub missing_bar_rows: usize,
    pub outlier_return_threshold: f64,
    pub warnings: Vec<String>,
}

fn keep_last_per_key<R: Keyed>(sorted: Vec<R>) -> (Vec<R>, usize) {
    let before = sorted.len();
    let mut kept: Vec<R> = Vec::with_capacity(before);
    for row in sorted {
        let same_key = kept
            .last()
            .is_some_and(|last| last.symbol() == row.symbol() && last.date() == row.date());
        if same_key {
            let last = kept.len() - 1;
            kept[last] = row;
        } else {
            kept.push(row);
        }
    }
    let removed = before - kept.len();
    (kept, removed)
}

/// Sort by (symbol, date) and keep the last row of each key.
///
/// The sort is stable, so ties go to whichever row came later in the input.
pub fn dedupe_by_input_order<R: Keyed>(mut rows: Vec<R>) -> (Vec<R>, usize) {
    rows.sort_by(|a, b| (a.symbol(), a.date()).cmp(&(b.symbol(), b.date())));
    keep_last_per_key(rows)
}

/// Sort by (symbol, date, pulled_at_utc) and keep the freshest row per key.
///
/// Rows without a pull timestamp sort before any timestamped row; equal
/// timestamps fall back to input order.
pub fn dedupe_latest<R: Keyed>(mut rows: Vec<R>) -> Vec<R> {
    rows.sort_by(|a, b| {
        (a.symbol(), a.date(), a.pulled_at_utc()).cmp(&(b.symbol(), b.date(), b.pulled_at_utc()))
    });
    keep_last_per_key(rows).0
}

/// OHLCV sanity: non-null, positive prices, non-negative volume and a
/// consistent high/low envelope.
pub fn is_valid(row: &CleanedRow) -> bool {
    let (Some(open), Some(high), Some(low), Some(close), Some(adj_close), Some(volume)) =
        (row.open, row.high, row.low, row.close, row.adj_close, row.volume)
    else {
        return false;
    };
    let positive = [open, high, low, close, adj_close].iter().all(|p| *p > 0.0);
    positive
        && volume >= 0
        && high >= open.max(close).max(low)
        && low <= open.min(close).min(high)
}

/// Drop invalid rows. Returns the survivors and the number dropped.
pub fn drop_invalid(rows: Vec<CleanedRow>) -> (Vec<CleanedRow>, usize) {
    let before = rows.len();
    let valid: Vec<CleanedRow> = rows.into_iter().filter(is_valid).collect();
    let removed = before - valid.len();
    (valid, removed)
}

/// Compute `daily_return` per symbol and flag jumps above `threshold`.
///
/// Rows must be sorted by (symbol, date). The first row of each symbol has
/// no return and is never flagged.
pub fn flag_outliers(mut rows: Vec<CleanedRow>, threshold: f64) -> (Vec<CleanedRow>, usize) {
    let mut flagged = 0;
    let mut prev: Option<(String, f64)> = None;
    for row in &mut rows {
        let adj = row.adj_close.unwrap_or(f64::NAN);
        row.daily_return = match &prev {
            Some((symbol, prev_adj)) if *symbol == row.symbol => Some(adj / prev_adj - 1.0),
            _ => None,
        };
        row.is_outlier_jump = row.daily_return.is_some_and(|r| r.abs() > threshold);
        if row.is_outlier_jump {
            flagged += 1;
        }
        prev = Some((row.symbol.clone(), adj));
    }
    (rows, flagged)
}

/// Run the whole quality pipeline over rows read from the normalized cache.
///
/// `symbols` must already be normalized.
pub fn run_quality(
    rows: Vec<CleanedRow>,
    symbols: &[String],
    threshold: f64,
) -> (Vec<CleanedRow>, QualitySummary) {
    let source_rows = rows.len();
    let mut warnings = Vec::new();
    if source_rows == 0 {
        warn!("{NO_SOURCE_ROWS_WARNING}");
        warnings.push(NO_SOURCE_ROWS_WARNING.to_string());
    }

    let (deduped, duplicate_rows_removed) = dedupe_by_input_order(rows);
    let (valid, invalid_rows_removed) = drop_invalid(deduped);
    let (flagged, outlier_rows_flagged) = flag_outliers(valid, threshold);
    let aligned = align_to_calendar(flagged, symbols);
    let missing_bar_rows = aligned.iter().filter(|r| r.is_missing_bar).count();

    let summary = QualitySummary {
        symbols_requested: symbols.len(),
        source_rows,
        duplicate_rows_removed,
        invalid_rows_removed,
        outlier_rows_flagged,
        aligned_rows: aligned.len(),
        missing_bar_rows,
        outlier_return_threshold: threshold,
        warnings,
    };
    info!(
        source_rows,
        duplicates = duplicate_rows_removed,
        invalid = invalid_rows_removed,
        outliers = outlier_rows_flagged,
        aligned = summary.aligned_rows,
        missing = missing_bar_rows,
        "quality checks complete"
    );
    (aligned, summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::test_support::{cleaned, cleaned_pulled};
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, day).unwrap()
    }

    #[test]
    fn dedupe_keeps_later_input_row() {
        let rows = vec![
            cleaned("SPY", d(3), 1.0),
            cleaned("SPY", d(2), 2.0),
            cleaned("SPY", d(3), 3.0),
        ];
        let (out, removed) = dedupe_by_input_order(rows);
        assert_eq!(removed, 1);
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].adj_close, Some(3.0));
    }

    #[test]
    fn dedupe_latest_prefers_newer_pull() {
        let rows = vec![
            cleaned_pulled("SPY", d(10), 2.0, 12),
            cleaned_pulled("SPY", d(10), 1.0, 9),
            cleaned_pulled("SPY", d(10), 3.0, 10),
        ];
        let out = dedupe_latest(rows);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].adj_close, Some(2.0));
    }

    #[test]
    fn dedupe_latest_ranks_missing_timestamp_first() {
        let mut stale = cleaned("SPY", d(10), 1.0);
        stale.pulled_at_utc = None;
        let rows = vec![cleaned_pulled("SPY", d(10), 2.0, 9), stale];
        let out = dedupe_latest(rows);
        assert_eq!(out[0].adj_close, Some(2.0));
    }

    #[test]
    fn validity_rules() {
        assert!(is_valid(&cleaned("SPY", d(2), 100.0)));

        let mut r = cleaned("SPY", d(2), 100.0);
        r.high = Some(99.0);
        assert!(!is_valid(&r), "high below close");

        let mut r = cleaned("SPY", d(2), 100.0);
        r.low = Some(101.0);
        assert!(!is_valid(&r), "low above close");

        let mut r = cleaned("SPY", d(2), 100.0);
        r.volume = Some(-1);
        assert!(!is_valid(&r));

        let mut r = cleaned("SPY", d(2), 100.0);
        r.adj_close = Some(0.0);
        assert!(!is_valid(&r));

        let mut r = cleaned("SPY", d(2), 100.0);
        r.open = None;
        assert!(!is_valid(&r));

        let mut r = cleaned("SPY", d(2), 100.0);
        r.volume = Some(0);
        assert!(is_valid(&r), "zero volume is allowed");
    }

    #[test]
    fn outliers_are_flagged_per_symbol() {
        let rows = vec![
            cleaned("QQQ", d(2), 10.0),
            cleaned("QQQ", d(3), 13.0),
            cleaned("SPY", d(2), 100.0),
            cleaned("SPY", d(3), 101.0),
        ];
        let (out, flagged) = flag_outliers(rows, 0.20);
        assert_eq!(flagged, 1);
        assert!(out[0].daily_return.is_none());
        assert!(out[1].is_outlier_jump);
        assert!(out[2].daily_return.is_none(), "no leakage across symbols");
        assert!(!out[3].is_outlier_jump);
        assert!((out[3].daily_return.unwrap() - 0.01).abs() < 1e-12);
    }

    #[test]
    fn run_quality_counts_everything() {
        let mut bad = cleaned("SPY", d(4), 100.0);
        bad.close = Some(-5.0);
        let rows = vec![
            cleaned("SPY", d(2), 100.0),
            cleaned("SPY", d(2), 100.5),
            cleaned("SPY", d(3), 150.0),
            bad,
            cleaned("QQQ", d(3), 50.0),
        ];
        let symbols = vec!["QQQ".to_string(), "SPY".to_string()];
        let (out, summary) = run_quality(rows, &symbols, DEFAULT_OUTLIER_THRESHOLD);

        assert_eq!(summary.source_rows, 5);
        assert_eq!(summary.duplicate_rows_removed, 1);
        assert_eq!(summary.invalid_rows_removed, 1);
        assert_eq!(summary.outlier_rows_flagged, 1);
        // Calendar is {d2, d3}: the invalid d4 row contributes no date.
        assert_eq!(summary.aligned_rows, 4);
        assert_eq!(summary.missing_bar_rows, 1);
        assert_eq!(out.len(), 4);
        assert!(summary.warnings.is_empty());
    }

    #[test]
    fn run_quality_without_rows_warns() {
        let (out, summary) = run_quality(Vec::new(), &["SPY".to_string()], 0.2);
        assert!(out.is_empty());
        assert_eq!(summary.warnings, vec![NO_SOURCE_ROWS_WARNING.to_string()]);
        assert_eq!(summary.symbols_requested, 1);
    }
}
