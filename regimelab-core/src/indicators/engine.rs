//! Per-symbol feature computation.
//!
//! Indicators are computed over one symbol's rows at a time, sorted by date,
//! so nothing leaks across symbols. Calendar placeholders enter every series
//! as gaps and leave with their indicator columns cleared.

use super::atr::{adjusted_high_low, wilder_atr};
use super::ema::ema;
use super::rsi::wilder_rsi;
use super::sma::{rolling_max, rolling_mean};
use crate::domain::{CleanedRow, FeatureRow, IndicatorColumns};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Indicator periods and the volume-average toggle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub sma200_period: usize,
    pub sma50_period: usize,
    pub ema20_period: usize,
    pub rsi14_period: usize,
    pub atr14_period: usize,
    pub rolling_high_period: usize,
    pub volume_sma50_period: usize,
    /// When false, `volume_sma50` is always null and excluded from readiness.
    pub include_volume_sma50: bool,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            sma200_period: 200,
            sma50_period: 50,
            ema20_period: 20,
            rsi14_period: 14,
            atr14_period: 14,
            rolling_high_period: 20,
            volume_sma50_period: 50,
            include_volume_sma50: true,
        }
    }
}

/// Features for a single symbol's cleaned rows, sorted by date.
pub fn compute_symbol_features(mut rows: Vec<CleanedRow>, config: &IndicatorConfig) -> Vec<FeatureRow> {
    rows.sort_by_key(|r| r.date);

    let observed = |r: &CleanedRow, v: Option<f64>| if r.is_missing_bar { None } else { v };
    let adj_close: Vec<Option<f64>> = rows.iter().map(|r| observed(r, r.adj_close)).collect();
    let (adj_high, adj_low): (Vec<Option<f64>>, Vec<Option<f64>>) = rows
        .iter()
        .map(|r| {
            let (h, l) = adjusted_high_low(r.high, r.low, r.close, r.adj_close);
            (observed(r, h), observed(r, l))
        })
        .unzip();
    let volume: Vec<Option<f64>> = rows
        .iter()
        .map(|r| observed(r, r.volume.map(|v| v as f64)))
        .collect();

    let sma200 = rolling_mean(&adj_close, config.sma200_period);
    let sma50 = rolling_mean(&adj_close, config.sma50_period);
    let ema20 = ema(&adj_close, config.ema20_period);
    let rsi14 = wilder_rsi(&adj_close, config.rsi14_period);
    let atr14 = wilder_atr(&adj_high, &adj_low, &adj_close, config.atr14_period);
    let rolling_high_20 = rolling_max(&adj_high, config.rolling_high_period);
    let volume_sma50 = if config.include_volume_sma50 {
        rolling_mean(&volume, config.volume_sma50_period)
    } else {
        vec![None; rows.len()]
    };

    rows.into_iter()
        .enumerate()
        .map(|(i, base)| {
            if base.is_missing_bar {
                return FeatureRow {
                    base,
                    indicators: IndicatorColumns::default(),
                    indicator_ready: false,
                };
            }
            let indicators = IndicatorColumns {
                sma200: sma200[i],
                sma50: sma50[i],
                ema20: ema20[i],
                rsi14: rsi14[i],
                atr14: atr14[i],
                rolling_high_20: rolling_high_20[i],
                volume_sma50: volume_sma50[i],
            };
            FeatureRow {
                indicator_ready: indicators.is_complete(config.include_volume_sma50),
                base,
                indicators,
            }
        })
        .collect()
}

/// Features for every symbol in `rows`, sorted by (symbol, date).
///
/// `rows` must hold one row per (symbol, date). Symbols are processed in
/// parallel.
pub fn compute_features(rows: Vec<CleanedRow>, config: &IndicatorConfig) -> Vec<FeatureRow> {
    let mut by_symbol: BTreeMap<String, Vec<CleanedRow>> = BTreeMap::new();
    for row in rows {
        by_symbol.entry(row.symbol.clone()).or_default().push(row);
    }

    let per_symbol: Vec<Vec<FeatureRow>> = by_symbol
        .into_par_iter()
        .map(|(_, symbol_rows)| compute_symbol_features(symbol_rows, config))
        .collect();
    per_symbol.into_iter().flatten().collect()
}
