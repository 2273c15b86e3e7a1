//! Property tests for pipeline invariants.
//!
//! Uses proptest to verify:
//! 1. Calendar completeness: one cleaned row per (symbol, calendar date)
//! 2. Readiness masking: missing bars never carry indicators
//! 3. Warm-up: series shorter than a period never produce that indicator
//! 4. Freshness dedup: the latest pull always wins

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use regimelab_core::data::{dedupe_latest, run_quality};
use regimelab_core::domain::{AdjustmentMethod, CleanedRow, IndicatorColumns};
use regimelab_core::indicators::{compute_features, IndicatorConfig};
use std::collections::BTreeSet;

// ── Helpers ──────────────────────────────────────────────────────────

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 2).unwrap()
}

fn row(symbol: &str, day: i64, price: f64, pulled_hour: u32) -> CleanedRow {
    CleanedRow {
        symbol: symbol.to_string(),
        date: base_date() + Duration::days(day),
        open: Some(price),
        high: Some(price * 1.01),
        low: Some(price * 0.99),
        close: Some(price),
        adj_close: Some(price),
        volume: Some(10_000),
        adjustment_factor: Some(1.0),
        adjustment_method: Some(AdjustmentMethod::None),
        source: Some("prop".into()),
        exchange: Some("SMART".into()),
        currency: Some("USD".into()),
        what_to_show: Some("TRADES".into()),
        pulled_at_utc: Some(Utc.with_ymd_and_hms(2026, 1, 1, pulled_hour, 0, 0).unwrap()),
        daily_return: None,
        is_outlier_jump: false,
        is_missing_bar: false,
    }
}

fn small_config() -> IndicatorConfig {
    IndicatorConfig {
        sma200_period: 10,
        sma50_period: 5,
        ema20_period: 4,
        rsi14_period: 3,
        atr14_period: 3,
        rolling_high_period: 4,
        volume_sma50_period: 5,
        include_volume_sma50: true,
    }
}

// ── Strategies (proptest) ────────────────────────────────────────────

const SYMBOLS: [&str; 3] = ["AAA", "BBB", "CCC"];

/// (symbol index, day offset, price) triples, possibly repeating keys.
fn arb_rows() -> impl Strategy<Value = Vec<(usize, i64, f64)>> {
    prop::collection::vec((0..SYMBOLS.len(), 0..40i64, 10.0..500.0_f64), 0..120)
}

// ── 1. Calendar completeness ─────────────────────────────────────────

proptest! {
    #[test]
    fn cleaned_output_is_full_cross_product(raw in arb_rows()) {
        let rows: Vec<CleanedRow> = raw
            .iter()
            .map(|(s, day, price)| row(SYMBOLS[*s], *day, *price, 12))
            .collect();
        let expected_dates: BTreeSet<NaiveDate> = rows.iter().map(|r| r.date).collect();
        let symbols: Vec<String> = SYMBOLS.iter().map(|s| s.to_string()).collect();

        let (cleaned, summary) = run_quality(rows, &symbols, 0.2);

        prop_assert_eq!(cleaned.len(), symbols.len() * expected_dates.len());
        prop_assert_eq!(summary.aligned_rows, cleaned.len());
        for symbol in &symbols {
            let dates: Vec<NaiveDate> = cleaned
                .iter()
                .filter(|r| &r.symbol == symbol)
                .map(|r| r.date)
                .collect();
            let expected: Vec<NaiveDate> = expected_dates.iter().copied().collect();
            prop_assert_eq!(dates, expected);
        }
        for r in cleaned.iter().filter(|r| r.is_missing_bar) {
            prop_assert!(r.open.is_none() && r.adj_close.is_none() && r.volume.is_none());
            prop_assert!(r.daily_return.is_none());
            prop_assert!(!r.is_outlier_jump);
        }
    }
}

// ── 2. Readiness masking ─────────────────────────────────────────────

proptest! {
    #[test]
    fn missing_bars_never_carry_indicators(
        len in 1usize..60,
        gaps in prop::collection::vec(any::<bool>(), 60),
        drift in -0.02..0.02_f64,
    ) {
        let rows: Vec<CleanedRow> = (0..len)
            .map(|i| {
                if gaps[i] && i % 3 == 0 {
                    CleanedRow::missing("AAA", base_date() + Duration::days(i as i64))
                } else {
                    row("AAA", i as i64, 100.0 * (1.0 + drift).powi(i as i32), 12)
                }
            })
            .collect();

        let features = compute_features(rows, &small_config());
        for f in &features {
            if f.base.is_missing_bar {
                prop_assert_eq!(f.indicators, IndicatorColumns::default());
                prop_assert!(!f.indicator_ready);
            }
            if f.indicator_ready {
                prop_assert!(f.indicators.is_complete(true));
            }
        }
    }
}

// ── 3. Warm-up ───────────────────────────────────────────────────────

proptest! {
    #[test]
    fn short_series_stays_blank(len in 0usize..10, start in 10.0..100.0_f64) {
        let config = small_config();
        let rows: Vec<CleanedRow> = (0..len)
            .map(|i| row("AAA", i as i64, start + i as f64, 12))
            .collect();

        let features = compute_features(rows, &config);
        prop_assert_eq!(features.len(), len);
        for f in &features {
            prop_assert!(f.indicators.sma200.is_none());
            prop_assert!(!f.indicator_ready);
        }
    }
}

// ── 4. Freshness dedup ───────────────────────────────────────────────

proptest! {
    #[test]
    fn latest_pull_wins(hours in prop::collection::vec(0u32..24, 1..8)) {
        let rows: Vec<CleanedRow> = hours
            .iter()
            .map(|h| row("AAA", 0, 100.0 + *h as f64, *h))
            .collect();
        let newest = *hours.iter().max().unwrap();

        let out = dedupe_latest(rows);
        prop_assert_eq!(out.len(), 1);
        prop_assert_eq!(out[0].adj_close, Some(100.0 + newest as f64));
    }
}
