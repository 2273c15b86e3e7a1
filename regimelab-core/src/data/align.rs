//! Multi-symbol calendar alignment.
//!
//! Every requested symbol is reindexed onto the union of observed dates.
//! Dates a symbol has no row for get a placeholder with every price null and
//! `is_missing_bar` set (no forward-fill of tradable price data).

use crate::domain::CleanedRow;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};

/// The sorted set of distinct dates across `rows`.
pub fn calendar(rows: &[CleanedRow]) -> Vec<NaiveDate> {
    rows.iter()
        .map(|r| r.date)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Cross `symbols` with the calendar of `rows`.
///
/// `rows` must hold at most one row per (symbol, date). Output is sorted by
/// (symbol, date); rows for symbols outside `symbols` are dropped.
pub fn align_to_calendar(rows: Vec<CleanedRow>, symbols: &[String]) -> Vec<CleanedRow> {
    let dates = calendar(&rows);
    let mut sorted_symbols: Vec<&String> = symbols.iter().collect();
    sorted_symbols.sort();
    sorted_symbols.dedup();

    let mut by_key: HashMap<(String, NaiveDate), CleanedRow> = rows
        .into_iter()
        .map(|r| ((r.symbol.clone(), r.date), r))
        .collect();

    let mut aligned = Vec::with_capacity(sorted_symbols.len() * dates.len());
    for symbol in sorted_symbols {
        for date in &dates {
            let row = by_key
                .remove(&(symbol.clone(), *date))
                .map(|mut r| {
                    r.is_missing_bar = false;
                    r
                })
                .unwrap_or_else(|| CleanedRow::missing(symbol, *date));
            aligned.push(row);
        }
    }
    aligned
}
