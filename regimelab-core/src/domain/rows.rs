//! Row shapes for each cache stage.
//!
//! Each stage's row is a superset of the previous one:
//! raw → normalized → cleaned → feature → signal.

use super::bar::{AdjustmentMethod, Bar, Provenance};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identity of a row inside the partitioned caches.
pub trait Keyed {
    fn symbol(&self) -> &str;
    fn date(&self) -> NaiveDate;

    /// Pull timestamp used for freshness-aware deduplication.
    fn pulled_at_utc(&self) -> Option<DateTime<Utc>> {
        None
    }
}

/// Raw cache row: the broker bar plus provenance, nothing derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    pub bar: Bar,
    pub provenance: Provenance,
}

/// Normalized cache row.
///
/// `adjustment_factor` is always finite and positive; with
/// `AdjustmentMethod::None` it is exactly 1.0 and `adj_close == close`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRow {
    pub bar: Bar,
    pub adj_close: f64,
    pub adjustment_factor: f64,
    pub adjustment_method: AdjustmentMethod,
    pub provenance: Provenance,
}

/// Cleaned cache row, one per (symbol, calendar date).
///
/// Price and provenance fields are optional because calendar alignment
/// synthesizes placeholders (`is_missing_bar`) with every one of them null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanedRow {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub adj_close: Option<f64>,
    pub volume: Option<i64>,
    pub adjustment_factor: Option<f64>,
    pub adjustment_method: Option<AdjustmentMethod>,
    pub source: Option<String>,
    pub exchange: Option<String>,
    pub currency: Option<String>,
    pub what_to_show: Option<String>,
    pub pulled_at_utc: Option<DateTime<Utc>>,
    pub daily_return: Option<f64>,
    pub is_outlier_jump: bool,
    pub is_missing_bar: bool,
}

impl CleanedRow {
    /// Placeholder for a calendar date on which the symbol has no bar.
    pub fn missing(symbol: &str, date: NaiveDate) -> Self {
        Self {
            symbol: symbol.to_string(),
            date,
            open: None,
            high: None,
            low: None,
            close: None,
            adj_close: None,
            volume: None,
            adjustment_factor: None,
            adjustment_method: None,
            source: None,
            exchange: None,
            currency: None,
            what_to_show: None,
            pulled_at_utc: None,
            daily_return: None,
            is_outlier_jump: false,
            is_missing_bar: true,
        }
    }

    /// Lift a normalized row; flags start cleared.
    pub fn from_normalized(row: &NormalizedRow) -> Self {
        Self {
            symbol: row.bar.symbol.clone(),
            date: row.bar.date,
            open: Some(row.bar.open),
            high: Some(row.bar.high),
            low: Some(row.bar.low),
            close: Some(row.bar.close),
            adj_close: Some(row.adj_close),
            volume: Some(row.bar.volume),
            adjustment_factor: Some(row.adjustment_factor),
            adjustment_method: Some(row.adjustment_method),
            source: Some(row.provenance.source.clone()),
            exchange: Some(row.provenance.exchange.clone()),
            currency: Some(row.provenance.currency.clone()),
            what_to_show: Some(row.provenance.what_to_show.clone()),
            pulled_at_utc: Some(row.provenance.pulled_at_utc),
            daily_return: None,
            is_outlier_jump: false,
            is_missing_bar: false,
        }
    }
}

/// The indicator columns of a feature row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorColumns {
    pub sma200: Option<f64>,
    pub sma50: Option<f64>,
    pub ema20: Option<f64>,
    pub rsi14: Option<f64>,
    pub atr14: Option<f64>,
    pub rolling_high_20: Option<f64>,
    pub volume_sma50: Option<f64>,
}

impl IndicatorColumns {
    /// Column names, in the order they are written.
    pub const NAMES: [&'static str; 7] = [
        "sma200",
        "sma50",
        "ema20",
        "rsi14",
        "atr14",
        "rolling_high_20",
        "volume_sma50",
    ];

    /// True when every column that takes part in readiness is present.
    pub fn is_complete(&self, include_volume_sma50: bool) -> bool {
        let core = self.sma200.is_some()
            && self.sma50.is_some()
            && self.ema20.is_some()
            && self.rsi14.is_some()
            && self.atr14.is_some()
            && self.rolling_high_20.is_some();
        core && (!include_volume_sma50 || self.volume_sma50.is_some())
    }
}

/// Feature cache row.
///
/// Missing bars always carry cleared indicators and `indicator_ready == false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub base: CleanedRow,
    pub indicators: IndicatorColumns,
    pub indicator_ready: bool,
}

/// Benchmark verdict attached to a target row by the regime filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeState {
    pub regime_known: bool,
    pub regime_on: bool,
    pub regime_benchmark_symbol: String,
    pub benchmark_adj_close: Option<f64>,
    pub benchmark_sma200: Option<f64>,
}

impl RegimeState {
    /// Verdict for a date the benchmark series does not cover.
    pub fn unknown(benchmark: &str) -> Self {
        Self {
            regime_known: false,
            regime_on: false,
            regime_benchmark_symbol: benchmark.to_string(),
            benchmark_adj_close: None,
            benchmark_sma200: None,
        }
    }
}

/// Per-symbol trend eligibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendState {
    pub trend_known: bool,
    pub trend_eligible: bool,
}

/// Signal cache row: a feature row with whichever annotations have been
/// applied so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRow {
    pub feature: FeatureRow,
    pub regime: Option<RegimeState>,
    pub trend: Option<TrendState>,
}

impl SignalRow {
    pub fn from_feature(feature: FeatureRow) -> Self {
        Self {
            feature,
            regime: None,
            trend: None,
        }
    }
}

impl Keyed for RawRow {
    fn symbol(&self) -> &str {
        &self.bar.symbol
    }
    fn date(&self) -> NaiveDate {
        self.bar.date
    }
    fn pulled_at_utc(&self) -> Option<DateTime<Utc>> {
        Some(self.provenance.pulled_at_utc)
    }
}

impl Keyed for NormalizedRow {
    fn symbol(&self) -> &str {
        &self.bar.symbol
    }
    fn date(&self) -> NaiveDate {
        self.bar.date
    }
    fn pulled_at_utc(&self) -> Option<DateTime<Utc>> {
        Some(self.provenance.pulled_at_utc)
    }
}

impl Keyed for CleanedRow {
    fn symbol(&self) -> &str {
        &self.symbol
    }
    fn date(&self) -> NaiveDate {
        self.date
    }
    fn pulled_at_utc(&self) -> Option<DateTime<Utc>> {
        self.pulled_at_utc
    }
}

impl Keyed for FeatureRow {
    fn symbol(&self) -> &str {
        &self.base.symbol
    }
    fn date(&self) -> NaiveDate {
        self.base.date
    }
    fn pulled_at_utc(&self) -> Option<DateTime<Utc>> {
        self.base.pulled_at_utc
    }
}

impl Keyed for SignalRow {
    fn symbol(&self) -> &str {
        self.feature.symbol()
    }
    fn date(&self) -> NaiveDate {
        self.feature.date()
    }
    fn pulled_at_utc(&self) -> Option<DateTime<Utc>> {
        self.feature.pulled_at_utc()
    }
}
