//! Indicator engine.
//!
//! Series primitives work on `&[Option<f64>]`, one entry per calendar row,
//! `None` marking a row with no observation. Rolling windows need every row
//! of the window observed; recursive indicators (EMA, RSI, ATR) step over
//! gaps and only count observations toward their warm-up.

pub mod atr;
pub mod ema;
pub mod engine;
pub mod rsi;
pub mod sma;

pub use atr::{adjusted_high_low, true_range, wilder_atr, wilder_smooth};
pub use ema::ema;
pub use engine::{compute_features, compute_symbol_features, IndicatorConfig};
pub use rsi::wilder_rsi;
pub use sma::{rolling_max, rolling_mean};

/// Fully observed series from plain values.
#[cfg(test)]
pub fn series(values: &[f64]) -> Vec<Option<f64>> {
    values.iter().copied().map(Some).collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
