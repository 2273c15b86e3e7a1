//! Criterion benchmarks for RegimeLab hot paths.
//!
//! Benchmarks:
//! 1. Series primitives (rolling mean, EMA, RSI, ATR)
//! 2. Full feature computation (single symbol and a parallel universe)
//! 3. Quality pipeline over a gappy multi-symbol universe

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use regimelab_core::data::run_quality;
use regimelab_core::domain::{AdjustmentMethod, CleanedRow};
use regimelab_core::indicators::{
    compute_features, compute_symbol_features, ema, rolling_mean, wilder_atr, wilder_rsi,
    IndicatorConfig,
};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_rows(symbol: &str, n: usize) -> Vec<CleanedRow> {
    let base_date = NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
    let pulled = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.1).sin() * 10.0;
            CleanedRow {
                symbol: symbol.to_string(),
                date: base_date + Duration::days(i as i64),
                open: Some(close - 0.3),
                high: Some(close + 1.5),
                low: Some(close - 1.5),
                close: Some(close),
                adj_close: Some(close),
                volume: Some(1_000_000 + (i as i64 % 500_000)),
                adjustment_factor: Some(1.0),
                adjustment_method: Some(AdjustmentMethod::None),
                source: Some("bench".into()),
                exchange: Some("SMART".into()),
                currency: Some("USD".into()),
                what_to_show: Some("TRADES".into()),
                pulled_at_utc: Some(pulled),
                daily_return: None,
                is_outlier_jump: false,
                is_missing_bar: false,
            }
        })
        .collect()
}

fn closes(n: usize) -> Vec<Option<f64>> {
    (0..n)
        .map(|i| Some(100.0 + (i as f64 * 0.1).sin() * 10.0))
        .collect()
}

// ── 1. Series primitives ─────────────────────────────────────────────

fn bench_primitives(c: &mut Criterion) {
    let mut group = c.benchmark_group("series_primitives");

    for &n in &[252, 1260, 2520] {
        let series = closes(n);
        let high: Vec<Option<f64>> = series.iter().map(|v| v.map(|x| x + 1.5)).collect();
        let low: Vec<Option<f64>> = series.iter().map(|v| v.map(|x| x - 1.5)).collect();

        group.bench_with_input(BenchmarkId::new("sma200", n), &series, |b, s| {
            b.iter(|| rolling_mean(black_box(s), 200))
        });
        group.bench_with_input(BenchmarkId::new("ema20", n), &series, |b, s| {
            b.iter(|| ema(black_box(s), 20))
        });
        group.bench_with_input(BenchmarkId::new("rsi14", n), &series, |b, s| {
            b.iter(|| wilder_rsi(black_box(s), 14))
        });
        group.bench_function(BenchmarkId::new("atr14", n), |b| {
            b.iter(|| wilder_atr(black_box(&high), black_box(&low), black_box(&series), 14))
        });
    }

    group.finish();
}

// ── 2. Feature computation ───────────────────────────────────────────

fn bench_features(c: &mut Criterion) {
    let mut group = c.benchmark_group("feature_compute");
    let config = IndicatorConfig::default();

    for &n in &[252, 1260, 2520] {
        let rows = make_rows("BENCH", n);
        group.bench_with_input(BenchmarkId::new("single_symbol", n), &rows, |b, rows| {
            b.iter(|| compute_symbol_features(black_box(rows.clone()), &config))
        });
    }

    let universe: Vec<CleanedRow> = (0..20)
        .flat_map(|i| make_rows(&format!("SYM{i:02}"), 1260))
        .collect();
    group.bench_function("20_symbols_1260_rows", |b| {
        b.iter(|| compute_features(black_box(universe.clone()), &config))
    });

    group.finish();
}

// ── 3. Quality pipeline ──────────────────────────────────────────────

fn bench_quality(c: &mut Criterion) {
    let mut group = c.benchmark_group("quality_pipeline");

    let symbols: Vec<String> = (0..10).map(|i| format!("SYM{i:02}")).collect();
    let rows: Vec<CleanedRow> = symbols
        .iter()
        .enumerate()
        .flat_map(|(k, s)| {
            make_rows(s, 1260)
                .into_iter()
                .enumerate()
                .filter(move |(i, _)| (i + k) % 17 != 0)
                .map(|(_, r)| r)
        })
        .collect();

    group.bench_function("10_symbols_1260_rows_gappy", |b| {
        b.iter(|| run_quality(black_box(rows.clone()), &symbols, 0.2))
    });

    group.finish();
}

criterion_group!(benches, bench_primitives, bench_features, bench_quality);
criterion_main!(benches);
