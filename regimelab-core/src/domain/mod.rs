//! Domain types for the regime pipeline

pub mod bar;
pub mod ids;
pub mod rows;

pub use bar::{AdjustmentMethod, Bar, Provenance};
pub use ids::{Clock, FixedClock, FixedRunIds, RandomRunIds, RunIdGenerator, SystemClock};
pub use rows::{
    CleanedRow, FeatureRow, IndicatorColumns, Keyed, NormalizedRow, RawRow, RegimeState,
    SignalRow, TrendState,
};

use crate::data::DataError;
use std::collections::BTreeSet;

/// Symbol type alias
pub type Symbol = String;

/// Canonical form of a ticker: trimmed and uppercased.
pub fn normalize_symbol(symbol: &str) -> Symbol {
    symbol.trim().to_uppercase()
}

/// Trim, uppercase, drop blanks, dedupe and sort a symbol list.
///
/// Fails with `EmptySymbolList` when nothing usable remains.
pub fn normalize_symbols<S: AsRef<str>>(symbols: &[S]) -> Result<Vec<Symbol>, DataError> {
    let set: BTreeSet<Symbol> = symbols
        .iter()
        .map(|s| normalize_symbol(s.as_ref()))
        .filter(|s| !s.is_empty())
        .collect();
    if set.is_empty() {
        return Err(DataError::EmptySymbolList);
    }
    Ok(set.into_iter().collect())
}
