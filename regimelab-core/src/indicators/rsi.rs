//! Relative Strength Index (RSI).
//!
//! Uses Wilder smoothing of average gains and average losses, each seeded
//! with the first change.
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss)
//! Changes are taken between consecutive observations; the first value
//! appears once `period` changes have been seen.
//! Edge case: avg_loss == 0 → RSI = 100 (flat series included).

use super::atr::wilder_smooth;

/// Wilder RSI over the observed values of `values`.
pub fn wilder_rsi(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let n = values.len();
    let mut gains = vec![None; n];
    let mut losses = vec![None; n];
    let mut prev_value: Option<f64> = None;

    for (i, v) in values.iter().enumerate() {
        let Some(x) = v.filter(|x| x.is_finite()) else {
            continue;
        };
        if let Some(p) = prev_value.replace(x) {
            let change = x - p;
            gains[i] = Some(change.max(0.0));
            losses[i] = Some((-change).max(0.0));
        }
    }

    let avg_gain = wilder_smooth(&gains, period);
    let avg_loss = wilder_smooth(&losses, period);
    avg_gain
        .into_iter()
        .zip(avg_loss)
        .map(|(g, l)| Some(compute_rsi(g?, l?)))
        .collect()
}

fn compute_rsi(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}
