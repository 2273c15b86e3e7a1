//! Raw bar → normalized row conversion.
//!
//! The adjusted-close stream is optional: when it is unavailable, empty or
//! shares no dates with the raw stream, close doubles as adj_close and the
//! reason is reported as a warning instead of an error.

use super::provider::BrokerError;
use crate::domain::{AdjustmentMethod, Bar, NormalizedRow, Provenance, RawRow};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Result of normalizing one symbol's raw rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalization {
    pub rows: Vec<NormalizedRow>,
    pub method: AdjustmentMethod,
    pub warnings: Vec<String>,
}

/// Broker bars → raw cache rows.
///
/// Bars with a non-finite price are dropped, the rest are sorted by date and
/// the last bar wins when a date repeats. Every row is stamped with `symbol`.
pub fn bars_to_rows(symbol: &str, bars: &[Bar], provenance: &Provenance) -> Vec<RawRow> {
    let mut by_date: BTreeMap<NaiveDate, &Bar> = BTreeMap::new();
    for bar in bars.iter().filter(|b| b.has_finite_prices()) {
        by_date.insert(bar.date, bar);
    }
    by_date
        .into_values()
        .map(|bar| RawRow {
            bar: Bar {
                symbol: symbol.to_string(),
                ..bar.clone()
            },
            provenance: provenance.clone(),
        })
        .collect()
}

/// `adj / close`, or 1.0 when that is not a finite positive number.
pub fn adjustment_factor(adj_close: f64, close: f64) -> f64 {
    let factor = adj_close / close;
    if close != 0.0 && factor.is_finite() && factor > 0.0 {
        factor
    } else {
        1.0
    }
}

fn unadjusted(raw: &[RawRow]) -> Vec<NormalizedRow> {
    raw.iter()
        .map(|r| NormalizedRow {
            bar: r.bar.clone(),
            adj_close: r.bar.close,
            adjustment_factor: 1.0,
            adjustment_method: AdjustmentMethod::None,
            provenance: r.provenance.clone(),
        })
        .collect()
}

/// Attach adjusted closes to `raw`, falling back to close where needed.
///
/// `adjusted` is the outcome of the ADJUSTED_LAST request, after retries.
pub fn normalize(
    symbol: &str,
    raw: &[RawRow],
    adjusted: Result<&[Bar], &BrokerError>,
) -> Normalization {
    let fallback = |warning: String| Normalization {
        rows: unadjusted(raw),
        method: AdjustmentMethod::None,
        warnings: vec![warning],
    };

    let adjusted = match adjusted {
        Ok(bars) => bars,
        Err(e) => {
            return fallback(format!(
                "Adjusted close request failed for {symbol}; using close as adj_close. Error: {e}"
            ))
        }
    };

    let mut adj_by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for bar in adjusted.iter().filter(|b| b.has_finite_prices()) {
        adj_by_date.insert(bar.date, bar.close);
    }
    if adj_by_date.is_empty() {
        return fallback(format!(
            "No ADJUSTED_LAST bars available for {symbol}; using close as adj_close."
        ));
    }
    if !raw.iter().any(|r| adj_by_date.contains_key(&r.bar.date)) {
        return fallback(format!(
            "No adjusted close values available for {symbol}; using close as adj_close."
        ));
    }

    let method = AdjustmentMethod::IbkrAdjustedLastFactor;
    let rows = raw
        .iter()
        .map(|r| {
            let (adj_close, factor) = match adj_by_date.get(&r.bar.date) {
                Some(&adj) => (adj, adjustment_factor(adj, r.bar.close)),
                None => (r.bar.close, 1.0),
            };
            NormalizedRow {
                bar: r.bar.clone(),
                adj_close,
                adjustment_factor: factor,
                adjustment_method: method,
                provenance: r.provenance.clone(),
            }
        })
        .collect();

    Normalization {
        rows,
        method,
        warnings: Vec::new(),
    }
}
