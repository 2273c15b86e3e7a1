//! Bar: the raw broker observation, plus the adjustment vocabulary that
//! travels with it into the normalized cache.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One OHLCV observation for a symbol on a date, exactly as the broker sent it.
///
/// The broker adapter converts whatever shape its client library returns into
/// this type; nothing past the ingestion boundary sees the library's shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl Bar {
    /// True when every price field is a finite number.
    ///
    /// Bars failing this are dropped at conversion time; they carry no usable
    /// price and the quality stage would reject them anyway.
    pub fn has_finite_prices(&self) -> bool {
        self.open.is_finite() && self.high.is_finite() && self.low.is_finite() && self.close.is_finite()
    }
}

/// How `adj_close` was derived for a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentMethod {
    /// No adjusted stream was usable: `adj_close == close`, factor 1.0.
    None,
    /// Factor taken from the broker's ADJUSTED_LAST close on matching dates.
    IbkrAdjustedLastFactor,
}

impl AdjustmentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::IbkrAdjustedLastFactor => "ibkr_adjusted_last_factor",
        }
    }
}

impl fmt::Display for AdjustmentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdjustmentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "ibkr_adjusted_last_factor" => Ok(Self::IbkrAdjustedLastFactor),
            other => Err(format!("unknown adjustment method '{other}'")),
        }
    }
}

/// Where a row came from and when it was pulled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub source: String,
    pub exchange: String,
    pub currency: String,
    pub what_to_show: String,
    pub pulled_at_utc: DateTime<Utc>,
}
