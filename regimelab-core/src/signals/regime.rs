//! Market regime filter: benchmark above its long moving average.
//!
//! The benchmark's verdict for a date is joined onto every target symbol's
//! row for that date. Dates the benchmark does not cover are "unknown",
//! which reads as off.

use crate::data::DataError;
use crate::domain::{FeatureRow, RegimeState, SignalRow};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Regime verdict for one benchmark feature row.
pub fn regime_state(benchmark_row: &FeatureRow, benchmark: &str) -> RegimeState {
    let adj_close = benchmark_row.base.adj_close;
    let sma200 = benchmark_row.indicators.sma200;
    let regime_known = adj_close.is_some() && sma200.is_some();
    let regime_on = match (adj_close, sma200) {
        (Some(close), Some(sma)) => close > sma,
        _ => false,
    };
    RegimeState {
        regime_known,
        regime_on,
        regime_benchmark_symbol: benchmark.to_string(),
        benchmark_adj_close: adj_close,
        benchmark_sma200: sma200,
    }
}

/// Date → verdict for the benchmark's rows in `features`.
///
/// `features` should already be freshness-deduplicated; a repeated date
/// keeps its last row. Fails when the benchmark has no rows at all.
pub fn regime_table(
    features: &[FeatureRow],
    benchmark: &str,
) -> Result<BTreeMap<NaiveDate, RegimeState>, DataError> {
    let table: BTreeMap<NaiveDate, RegimeState> = features
        .iter()
        .filter(|r| r.base.symbol == benchmark)
        .map(|r| (r.base.date, regime_state(r, benchmark)))
        .collect();
    if table.is_empty() {
        return Err(DataError::BenchmarkMissing {
            symbol: benchmark.to_string(),
        });
    }
    Ok(table)
}

/// Attach the benchmark verdict to each target row by date alone.
pub fn apply_regime(
    targets: Vec<FeatureRow>,
    table: &BTreeMap<NaiveDate, RegimeState>,
    benchmark: &str,
) -> Vec<SignalRow> {
    let mut rows: Vec<SignalRow> = targets
        .into_iter()
        .map(|feature| {
            let regime = table
                .get(&feature.base.date)
                .cloned()
                .unwrap_or_else(|| RegimeState::unknown(benchmark));
            SignalRow {
                feature,
                regime: Some(regime),
                trend: None,
            }
        })
        .collect();
    rows.sort_by(|a, b| {
        (&a.feature.base.symbol, a.feature.base.date).cmp(&(&b.feature.base.symbol, b.feature.base.date))
    });
    rows
}
