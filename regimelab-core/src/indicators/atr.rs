//! Average True Range (ATR) over dividend/split-adjusted prices.
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|)
//! ATR uses Wilder smoothing (alpha = 1/period) seeded with the first true
//! range. The first observation has no previous close, so its true range is
//! high - low, and the first ATR appears at the `period`-th observation.

/// Scale raw high/low by `adj_close / close`.
///
/// A zero, missing or non-finite ratio falls back to 1.0.
pub fn adjusted_high_low(
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    adj_close: Option<f64>,
) -> (Option<f64>, Option<f64>) {
    let ratio = match (adj_close, close) {
        (Some(adj), Some(c)) if c != 0.0 && (adj / c).is_finite() => adj / c,
        _ => 1.0,
    };
    (high.map(|h| h * ratio), low.map(|l| l * ratio))
}

/// True range for each row; `None` where the row is missing. Without a
/// previous observed close the range is high - low.
pub fn true_range(
    high: &[Option<f64>],
    low: &[Option<f64>],
    close: &[Option<f64>],
) -> Vec<Option<f64>> {
    let n = high.len().min(low.len()).min(close.len());
    let mut tr = vec![None; n];
    let mut prev_close: Option<f64> = None;

    for i in 0..n {
        let (Some(h), Some(l), Some(c)) = (high[i], low[i], close[i]) else {
            continue;
        };
        let v = match prev_close {
            Some(pc) => (h - l).abs().max((h - pc).abs()).max((l - pc).abs()),
            None => (h - l).abs(),
        };
        if v.is_finite() {
            tr[i] = Some(v);
        }
        prev_close = Some(c);
    }
    tr
}

/// Wilder smoothing of the observed values of `values`.
///
/// `s[0] = x[0]`, `s[t] = (1 - 1/period) * s[t-1] + x[t] / period`, emitted
/// from the `period`-th observation on.
pub fn wilder_smooth(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let n = values.len();
    let mut result = vec![None; n];
    if period == 0 {
        return result;
    }

    let alpha = 1.0 / period as f64;
    let mut seen = 0usize;
    let mut acc: Option<f64> = None;
    for (i, v) in values.iter().enumerate() {
        let Some(x) = v.filter(|x| x.is_finite()) else {
            continue;
        };
        seen += 1;
        let s = match acc {
            Some(prev) => (1.0 - alpha) * prev + alpha * x,
            None => x,
        };
        acc = Some(s);
        if seen >= period {
            result[i] = Some(s);
        }
    }
    result
}

/// ATR over adjusted high/low/close.
pub fn wilder_atr(
    high: &[Option<f64>],
    low: &[Option<f64>],
    close: &[Option<f64>],
    period: usize,
) -> Vec<Option<f64>> {
    wilder_smooth(&true_range(high, low, close), period)
}
