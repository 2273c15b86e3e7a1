//! Column sets for every cached row type, and the DataFrame codec.
//!
//! Column order in a part file is not significant; column names are. Dates
//! are stored as Parquet `Date`, pull timestamps as RFC 3339 strings.

use crate::domain::{
    AdjustmentMethod, Bar, CleanedRow, FeatureRow, IndicatorColumns, NormalizedRow, Provenance,
    RawRow, RegimeState, SignalRow, TrendState,
};
use super::provider::DataError;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use polars::prelude::*;

/// Columns every price-bearing part file must carry.
pub const PRICE_COLUMNS: [&str; 8] = [
    "symbol", "date", "open", "high", "low", "close", "adj_close", "volume",
];

/// Columns the raw cache must carry.
pub const RAW_COLUMNS: [&str; 7] = ["symbol", "date", "open", "high", "low", "close", "volume"];

/// Indicator columns the signal stages depend on.
pub const SIGNAL_INPUT_COLUMNS: [&str; 2] = ["sma200", "sma50"];

const PROVENANCE_COLUMNS: [&str; 5] = [
    "source",
    "exchange",
    "currency",
    "what_to_show",
    "pulled_at_utc",
];

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default()
}

pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Unparseable timestamps read back as `None`.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

// ── Writing ─────────────────────────────────────────────────────────

/// Accumulates named columns into a DataFrame.
#[derive(Default)]
pub(crate) struct FrameBuilder {
    columns: Vec<Column>,
}

impl FrameBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strs<'a>(mut self, name: &str, values: impl IntoIterator<Item = &'a str>) -> Self {
        let values: Vec<&str> = values.into_iter().collect();
        self.columns.push(Column::new(name.into(), values));
        self
    }

    pub fn opt_strs<'a>(
        mut self,
        name: &str,
        values: impl IntoIterator<Item = Option<&'a str>>,
    ) -> Self {
        let values: Vec<Option<&str>> = values.into_iter().collect();
        self.columns.push(Column::new(name.into(), values));
        self
    }

    pub fn dates(
        mut self,
        name: &str,
        values: impl IntoIterator<Item = NaiveDate>,
    ) -> Result<Self, DataError> {
        let days: Vec<i32> = values
            .into_iter()
            .map(|d| (d - epoch()).num_days() as i32)
            .collect();
        let column = Column::new(name.into(), days)
            .cast(&DataType::Date)
            .map_err(|e| DataError::ParquetError(format!("date cast: {e}")))?;
        self.columns.push(column);
        Ok(self)
    }

    pub fn f64s(mut self, name: &str, values: impl IntoIterator<Item = f64>) -> Self {
        let values: Vec<f64> = values.into_iter().collect();
        self.columns.push(Column::new(name.into(), values));
        self
    }

    pub fn opt_f64s(mut self, name: &str, values: impl IntoIterator<Item = Option<f64>>) -> Self {
        let values: Vec<Option<f64>> = values.into_iter().collect();
        self.columns.push(Column::new(name.into(), values));
        self
    }

    pub fn i64s(mut self, name: &str, values: impl IntoIterator<Item = i64>) -> Self {
        let values: Vec<i64> = values.into_iter().collect();
        self.columns.push(Column::new(name.into(), values));
        self
    }

    pub fn opt_i64s(mut self, name: &str, values: impl IntoIterator<Item = Option<i64>>) -> Self {
        let values: Vec<Option<i64>> = values.into_iter().collect();
        self.columns.push(Column::new(name.into(), values));
        self
    }

    pub fn bools(mut self, name: &str, values: impl IntoIterator<Item = bool>) -> Self {
        let values: Vec<bool> = values.into_iter().collect();
        self.columns.push(Column::new(name.into(), values));
        self
    }

    pub fn build(self) -> Result<DataFrame, DataError> {
        DataFrame::new(self.columns)
            .map_err(|e| DataError::ParquetError(format!("dataframe creation: {e}")))
    }
}

// ── Reading ─────────────────────────────────────────────────────────

/// Typed column access over a DataFrame read from a part file.
///
/// Absent optional columns read back as all-null.
pub(crate) struct FrameReader<'a> {
    df: &'a DataFrame,
}

impl<'a> FrameReader<'a> {
    pub fn new(df: &'a DataFrame) -> Self {
        Self { df }
    }

    pub fn len(&self) -> usize {
        self.df.height()
    }

    pub fn has(&self, name: &str) -> bool {
        self.df.column(name).is_ok()
    }

    pub fn require(&self, names: &[&str]) -> Result<(), DataError> {
        let missing: Vec<String> = names
            .iter()
            .filter(|n| !self.has(n))
            .map(|n| n.to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(DataError::MissingColumns { columns: missing })
        }
    }

    fn cast(&self, name: &str, dtype: &DataType) -> Result<Option<Series>, DataError> {
        let Ok(column) = self.df.column(name) else {
            return Ok(None);
        };
        let series = column
            .as_materialized_series()
            .cast(dtype)
            .map_err(|e| DataError::ParquetError(format!("{name} column type: {e}")))?;
        Ok(Some(series))
    }

    pub fn dates(&self, name: &str) -> Result<Vec<Option<NaiveDate>>, DataError> {
        let Some(series) = self.cast(name, &DataType::Int32)? else {
            return Ok(vec![None; self.len()]);
        };
        let ca = series.i32()?;
        Ok(ca
            .into_iter()
            .map(|d| d.map(|days| epoch() + chrono::Duration::days(days as i64)))
            .collect())
    }

    pub fn f64s(&self, name: &str) -> Result<Vec<Option<f64>>, DataError> {
        let Some(series) = self.cast(name, &DataType::Float64)? else {
            return Ok(vec![None; self.len()]);
        };
        Ok(series.f64()?.into_iter().collect())
    }

    pub fn i64s(&self, name: &str) -> Result<Vec<Option<i64>>, DataError> {
        let Some(series) = self.cast(name, &DataType::Int64)? else {
            return Ok(vec![None; self.len()]);
        };
        Ok(series.i64()?.into_iter().collect())
    }

    pub fn bools(&self, name: &str) -> Result<Vec<Option<bool>>, DataError> {
        let Some(series) = self.cast(name, &DataType::Boolean)? else {
            return Ok(vec![None; self.len()]);
        };
        Ok(series.bool()?.into_iter().collect())
    }

    pub fn strs(&self, name: &str) -> Result<Vec<Option<String>>, DataError> {
        let Some(series) = self.cast(name, &DataType::String)? else {
            return Ok(vec![None; self.len()]);
        };
        Ok(series
            .str()?
            .into_iter()
            .map(|s| s.map(str::to_string))
            .collect())
    }

    /// Symbol and date for every row; both must be non-null.
    pub fn keys(&self) -> Result<Vec<(String, NaiveDate)>, DataError> {
        let symbols = self.strs("symbol")?;
        let dates = self.dates("date")?;
        symbols
            .into_iter()
            .zip(dates)
            .enumerate()
            .map(|(i, (s, d))| match (s, d) {
                (Some(s), Some(d)) => Ok((crate::domain::normalize_symbol(&s), d)),
                _ => Err(DataError::ValidationError(format!(
                    "null symbol or date at row {i}"
                ))),
            })
            .collect()
    }
}

// ── Row codecs ──────────────────────────────────────────────────────

/// Conversion between a row type and its columnar representation.
pub trait FrameCodec: Sized {
    /// Columns a part file must carry to decode into this type.
    fn required_columns() -> &'static [&'static str];

    fn to_frame(rows: &[&Self]) -> Result<DataFrame, DataError>;

    fn from_frame(df: &DataFrame) -> Result<Vec<Self>, DataError>;
}

fn read_bars(r: &FrameReader<'_>) -> Result<Vec<Bar>, DataError> {
    let keys = r.keys()?;
    let open = r.f64s("open")?;
    let high = r.f64s("high")?;
    let low = r.f64s("low")?;
    let close = r.f64s("close")?;
    let volume = r.i64s("volume")?;
    Ok(keys
        .into_iter()
        .enumerate()
        .map(|(i, (symbol, date))| Bar {
            symbol,
            date,
            open: open[i].unwrap_or(f64::NAN),
            high: high[i].unwrap_or(f64::NAN),
            low: low[i].unwrap_or(f64::NAN),
            close: close[i].unwrap_or(f64::NAN),
            volume: volume[i].unwrap_or(0),
        })
        .collect())
}

fn read_provenance(r: &FrameReader<'_>) -> Result<Vec<Provenance>, DataError> {
    let source = r.strs("source")?;
    let exchange = r.strs("exchange")?;
    let currency = r.strs("currency")?;
    let what_to_show = r.strs("what_to_show")?;
    let pulled = r.strs("pulled_at_utc")?;
    (0..r.len())
        .map(|i| {
            let pulled_at_utc = pulled[i]
                .as_deref()
                .and_then(parse_timestamp)
                .ok_or_else(|| {
                    DataError::ValidationError(format!("missing pulled_at_utc at row {i}"))
                })?;
            Ok(Provenance {
                source: source[i].clone().unwrap_or_default(),
                exchange: exchange[i].clone().unwrap_or_default(),
                currency: currency[i].clone().unwrap_or_default(),
                what_to_show: what_to_show[i].clone().unwrap_or_default(),
                pulled_at_utc,
            })
        })
        .collect()
}

fn bar_columns<'a>(
    builder: FrameBuilder,
    bars: impl Iterator<Item = &'a Bar> + Clone,
) -> Result<FrameBuilder, DataError> {
    Ok(builder
        .strs("symbol", bars.clone().map(|b| b.symbol.as_str()))
        .dates("date", bars.clone().map(|b| b.date))?
        .f64s("open", bars.clone().map(|b| b.open))
        .f64s("high", bars.clone().map(|b| b.high))
        .f64s("low", bars.clone().map(|b| b.low))
        .f64s("close", bars.clone().map(|b| b.close))
        .i64s("volume", bars.map(|b| b.volume)))
}

impl FrameCodec for RawRow {
    fn required_columns() -> &'static [&'static str] {
        &RAW_COLUMNS
    }

    fn to_frame(rows: &[&Self]) -> Result<DataFrame, DataError> {
        let builder = bar_columns(FrameBuilder::new(), rows.iter().map(|r| &r.bar))?;
        provenance_columns(builder, rows.iter().map(|r| &r.provenance)).build()
    }

    fn from_frame(df: &DataFrame) -> Result<Vec<Self>, DataError> {
        let r = FrameReader::new(df);
        r.require(Self::required_columns())?;
        r.require(&PROVENANCE_COLUMNS)?;
        let bars = read_bars(&r)?;
        let provenance = read_provenance(&r)?;
        Ok(bars
            .into_iter()
            .zip(provenance)
            .map(|(bar, provenance)| RawRow { bar, provenance })
            .collect())
    }
}

impl FrameCodec for NormalizedRow {
    fn required_columns() -> &'static [&'static str] {
        &PRICE_COLUMNS
    }

    fn to_frame(rows: &[&Self]) -> Result<DataFrame, DataError> {
        let builder = bar_columns(FrameBuilder::new(), rows.iter().map(|r| &r.bar))?
            .f64s("adj_close", rows.iter().map(|r| r.adj_close))
            .f64s("adjustment_factor", rows.iter().map(|r| r.adjustment_factor))
            .strs(
                "adjustment_method",
                rows.iter().map(|r| r.adjustment_method.as_str()),
            );
        provenance_columns(builder, rows.iter().map(|r| &r.provenance)).build()
    }

    fn from_frame(df: &DataFrame) -> Result<Vec<Self>, DataError> {
        let r = FrameReader::new(df);
        r.require(Self::required_columns())?;
        r.require(&PROVENANCE_COLUMNS)?;
        let bars = read_bars(&r)?;
        let provenance = read_provenance(&r)?;
        let adj_close = r.f64s("adj_close")?;
        let factor = r.f64s("adjustment_factor")?;
        let method = r.strs("adjustment_method")?;
        Ok(bars
            .into_iter()
            .zip(provenance)
            .enumerate()
            .map(|(i, (bar, provenance))| NormalizedRow {
                adj_close: adj_close[i].unwrap_or(f64::NAN),
                adjustment_factor: factor[i].unwrap_or(1.0),
                adjustment_method: method[i]
                    .as_deref()
                    .and_then(|m| m.parse().ok())
                    .unwrap_or(AdjustmentMethod::None),
                bar,
                provenance,
            })
            .collect())
    }
}

fn provenance_columns<'a>(
    builder: FrameBuilder,
    rows: impl Iterator<Item = &'a Provenance> + Clone,
) -> FrameBuilder {
    let stamps: Vec<String> = rows.clone().map(|p| format_timestamp(p.pulled_at_utc)).collect();
    builder
        .strs("what_to_show", rows.clone().map(|p| p.what_to_show.as_str()))
        .strs("exchange", rows.clone().map(|p| p.exchange.as_str()))
        .strs("currency", rows.clone().map(|p| p.currency.as_str()))
        .strs("source", rows.map(|p| p.source.as_str()))
        .strs("pulled_at_utc", stamps.iter().map(String::as_str))
}

fn cleaned_columns(builder: FrameBuilder, rows: &[&CleanedRow]) -> Result<FrameBuilder, DataError> {
    let stamps: Vec<Option<String>> = rows
        .iter()
        .map(|r| r.pulled_at_utc.map(format_timestamp))
        .collect();
    Ok(builder
        .strs("symbol", rows.iter().map(|r| r.symbol.as_str()))
        .dates("date", rows.iter().map(|r| r.date))?
        .opt_f64s("open", rows.iter().map(|r| r.open))
        .opt_f64s("high", rows.iter().map(|r| r.high))
        .opt_f64s("low", rows.iter().map(|r| r.low))
        .opt_f64s("close", rows.iter().map(|r| r.close))
        .opt_i64s("volume", rows.iter().map(|r| r.volume))
        .opt_f64s("adj_close", rows.iter().map(|r| r.adj_close))
        .opt_f64s("adjustment_factor", rows.iter().map(|r| r.adjustment_factor))
        .opt_strs(
            "adjustment_method",
            rows.iter().map(|r| r.adjustment_method.map(|m| m.as_str())),
        )
        .opt_strs("what_to_show", rows.iter().map(|r| r.what_to_show.as_deref()))
        .opt_strs("exchange", rows.iter().map(|r| r.exchange.as_deref()))
        .opt_strs("currency", rows.iter().map(|r| r.currency.as_deref()))
        .opt_strs("source", rows.iter().map(|r| r.source.as_deref()))
        .opt_strs("pulled_at_utc", stamps.iter().map(|s| s.as_deref()))
        .opt_f64s("daily_return", rows.iter().map(|r| r.daily_return))
        .bools("is_outlier_jump", rows.iter().map(|r| r.is_outlier_jump))
        .bools("is_missing_bar", rows.iter().map(|r| r.is_missing_bar)))
}

fn read_cleaned(r: &FrameReader<'_>) -> Result<Vec<CleanedRow>, DataError> {
    r.require(&PRICE_COLUMNS)?;
    let keys = r.keys()?;
    let open = r.f64s("open")?;
    let high = r.f64s("high")?;
    let low = r.f64s("low")?;
    let close = r.f64s("close")?;
    let adj_close = r.f64s("adj_close")?;
    let volume = r.i64s("volume")?;
    let factor = r.f64s("adjustment_factor")?;
    let method = r.strs("adjustment_method")?;
    let source = r.strs("source")?;
    let exchange = r.strs("exchange")?;
    let currency = r.strs("currency")?;
    let what_to_show = r.strs("what_to_show")?;
    let pulled = r.strs("pulled_at_utc")?;
    let daily_return = r.f64s("daily_return")?;
    let outlier = r.bools("is_outlier_jump")?;
    let missing = r.bools("is_missing_bar")?;

    Ok(keys
        .into_iter()
        .enumerate()
        .map(|(i, (symbol, date))| CleanedRow {
            symbol,
            date,
            open: open[i],
            high: high[i],
            low: low[i],
            close: close[i],
            adj_close: adj_close[i],
            volume: volume[i],
            adjustment_factor: factor[i],
            adjustment_method: method[i].as_deref().and_then(|m| m.parse().ok()),
            source: source[i].clone(),
            exchange: exchange[i].clone(),
            currency: currency[i].clone(),
            what_to_show: what_to_show[i].clone(),
            pulled_at_utc: pulled[i].as_deref().and_then(parse_timestamp),
            daily_return: daily_return[i],
            is_outlier_jump: outlier[i].unwrap_or(false),
            // Files written before alignment carry no flag: a row without an
            // open price is a placeholder.
            is_missing_bar: missing[i].unwrap_or(open[i].is_none()),
        })
        .collect())
}

impl FrameCodec for CleanedRow {
    fn required_columns() -> &'static [&'static str] {
        &PRICE_COLUMNS
    }

    fn to_frame(rows: &[&Self]) -> Result<DataFrame, DataError> {
        cleaned_columns(FrameBuilder::new(), rows)?.build()
    }

    fn from_frame(df: &DataFrame) -> Result<Vec<Self>, DataError> {
        read_cleaned(&FrameReader::new(df))
    }
}

fn feature_columns(builder: FrameBuilder, rows: &[&FeatureRow]) -> Result<FrameBuilder, DataError> {
    let bases: Vec<&CleanedRow> = rows.iter().map(|r| &r.base).collect();
    let ind = |f: fn(&IndicatorColumns) -> Option<f64>| rows.iter().map(move |r| f(&r.indicators));
    Ok(cleaned_columns(builder, &bases)?
        .opt_f64s("sma200", ind(|c| c.sma200))
        .opt_f64s("sma50", ind(|c| c.sma50))
        .opt_f64s("ema20", ind(|c| c.ema20))
        .opt_f64s("rsi14", ind(|c| c.rsi14))
        .opt_f64s("atr14", ind(|c| c.atr14))
        .opt_f64s("rolling_high_20", ind(|c| c.rolling_high_20))
        .opt_f64s("volume_sma50", ind(|c| c.volume_sma50))
        .bools("indicator_ready", rows.iter().map(|r| r.indicator_ready)))
}

fn read_features(r: &FrameReader<'_>) -> Result<Vec<FeatureRow>, DataError> {
    r.require(&SIGNAL_INPUT_COLUMNS)?;
    let bases = read_cleaned(r)?;
    let sma200 = r.f64s("sma200")?;
    let sma50 = r.f64s("sma50")?;
    let ema20 = r.f64s("ema20")?;
    let rsi14 = r.f64s("rsi14")?;
    let atr14 = r.f64s("atr14")?;
    let rolling_high_20 = r.f64s("rolling_high_20")?;
    let volume_sma50 = r.f64s("volume_sma50")?;
    let ready = r.bools("indicator_ready")?;

    Ok(bases
        .into_iter()
        .enumerate()
        .map(|(i, base)| FeatureRow {
            base,
            indicators: IndicatorColumns {
                sma200: sma200[i],
                sma50: sma50[i],
                ema20: ema20[i],
                rsi14: rsi14[i],
                atr14: atr14[i],
                rolling_high_20: rolling_high_20[i],
                volume_sma50: volume_sma50[i],
            },
            indicator_ready: ready[i].unwrap_or(false),
        })
        .collect())
}

impl FrameCodec for FeatureRow {
    fn required_columns() -> &'static [&'static str] {
        &PRICE_COLUMNS
    }

    fn to_frame(rows: &[&Self]) -> Result<DataFrame, DataError> {
        feature_columns(FrameBuilder::new(), rows)?.build()
    }

    fn from_frame(df: &DataFrame) -> Result<Vec<Self>, DataError> {
        read_features(&FrameReader::new(df))
    }
}

impl FrameCodec for SignalRow {
    fn required_columns() -> &'static [&'static str] {
        &PRICE_COLUMNS
    }

    fn to_frame(rows: &[&Self]) -> Result<DataFrame, DataError> {
        let features: Vec<&FeatureRow> = rows.iter().map(|r| &r.feature).collect();
        let mut builder = feature_columns(FrameBuilder::new(), &features)?;

        if rows.iter().any(|r| r.regime.is_some()) {
            let regime = |r: &&SignalRow| r.regime.clone();
            let states: Vec<Option<RegimeState>> = rows.iter().map(regime).collect();
            builder = builder
                .bools(
                    "regime_known",
                    states.iter().map(|s| s.as_ref().is_some_and(|s| s.regime_known)),
                )
                .bools(
                    "regime_on",
                    states.iter().map(|s| s.as_ref().is_some_and(|s| s.regime_on)),
                )
                .opt_strs(
                    "regime_benchmark_symbol",
                    states
                        .iter()
                        .map(|s| s.as_ref().map(|s| s.regime_benchmark_symbol.as_str())),
                )
                .opt_f64s(
                    "benchmark_adj_close",
                    states.iter().map(|s| s.as_ref().and_then(|s| s.benchmark_adj_close)),
                )
                .opt_f64s(
                    "benchmark_sma200",
                    states.iter().map(|s| s.as_ref().and_then(|s| s.benchmark_sma200)),
                );
        }

        if rows.iter().any(|r| r.trend.is_some()) {
            builder = builder
                .bools(
                    "trend_known",
                    rows.iter().map(|r| r.trend.is_some_and(|t| t.trend_known)),
                )
                .bools(
                    "trend_eligible",
                    rows.iter().map(|r| r.trend.is_some_and(|t| t.trend_eligible)),
                );
        }

        builder.build()
    }

    fn from_frame(df: &DataFrame) -> Result<Vec<Self>, DataError> {
        let r = FrameReader::new(df);
        let features = read_features(&r)?;

        let regime = if r.has("regime_known") {
            let known = r.bools("regime_known")?;
            let on = r.bools("regime_on")?;
            let bench = r.strs("regime_benchmark_symbol")?;
            let bench_close = r.f64s("benchmark_adj_close")?;
            let bench_sma = r.f64s("benchmark_sma200")?;
            Some((known, on, bench, bench_close, bench_sma))
        } else {
            None
        };
        let trend = if r.has("trend_known") {
            Some((r.bools("trend_known")?, r.bools("trend_eligible")?))
        } else {
            None
        };

        Ok(features
            .into_iter()
            .enumerate()
            .map(|(i, feature)| SignalRow {
                feature,
                regime: regime.as_ref().map(|(known, on, bench, close, sma)| RegimeState {
                    regime_known: known[i].unwrap_or(false),
                    regime_on: on[i].unwrap_or(false),
                    regime_benchmark_symbol: bench[i].clone().unwrap_or_default(),
                    benchmark_adj_close: close[i],
                    benchmark_sma200: sma[i],
                }),
                trend: trend.as_ref().map(|(known, eligible)| TrendState {
                    trend_known: known[i].unwrap_or(false),
                    trend_eligible: eligible[i].unwrap_or(false),
                }),
            })
            .collect())
    }
}
