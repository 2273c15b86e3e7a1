//! Trend eligibility: price above the long average, and the medium average
//! above the long one.

use crate::domain::{FeatureRow, SignalRow, TrendState};

pub fn trend_state(row: &FeatureRow) -> TrendState {
    match (row.base.adj_close, row.indicators.sma200, row.indicators.sma50) {
        (Some(close), Some(sma200), Some(sma50)) => TrendState {
            trend_known: true,
            trend_eligible: close > sma200 && sma50 > sma200,
        },
        _ => TrendState {
            trend_known: false,
            trend_eligible: false,
        },
    }
}

/// Annotate rows with trend state, keeping any regime annotation.
///
/// Output is sorted by (symbol, date).
pub fn apply_trend(rows: Vec<SignalRow>) -> Vec<SignalRow> {
    let mut rows: Vec<SignalRow> = rows
        .into_iter()
        .map(|mut row| {
            row.trend = Some(trend_state(&row.feature));
            row
        })
        .collect();
    rows.sort_by(|a, b| {
        (&a.feature.base.symbol, a.feature.base.date).cmp(&(&b.feature.base.symbol, b.feature.base.date))
    });
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::test_support::feature;
    use chrono::NaiveDate;

    fn d() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 10).unwrap()
    }

    #[test]
    fn eligible_needs_strict_confirmation() {
        let up = feature("AAPL", d(), Some(105.0), Some(100.0), Some(101.0));
        assert_eq!(
            trend_state(&up),
            TrendState {
                trend_known: true,
                trend_eligible: true
            }
        );

        let at_sma = feature("AAPL", d(), Some(100.0), Some(100.0), Some(101.0));
        let state = trend_state(&at_sma);
        assert!(state.trend_known);
        assert!(!state.trend_eligible);

        let crossed = feature("AAPL", d(), Some(105.0), Some(100.0), Some(99.0));
        assert!(!trend_state(&crossed).trend_eligible);
    }

    #[test]
    fn unknown_without_averages() {
        let warming = feature("AAPL", d(), Some(105.0), None, Some(101.0));
        assert_eq!(
            trend_state(&warming),
            TrendState {
                trend_known: false,
                trend_eligible: false
            }
        );
    }

    #[test]
    fn apply_keeps_regime() {
        let mut row = SignalRow::from_feature(feature("AAPL", d(), Some(105.0), Some(100.0), Some(101.0)));
        row.regime = Some(crate::domain::RegimeState::unknown("SPY"));
        let out = apply_trend(vec![row]);
        assert!(out[0].regime.is_some());
        assert!(out[0].trend.unwrap().trend_eligible);
    }
}
