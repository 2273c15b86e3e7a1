//! Exponential Moving Average (EMA).
//!
//! Recursive: EMA[t] = alpha * x[t] + (1 - alpha) * EMA[t-1], alpha = 2/(period+1).
//! Seed: SMA of the first `period` observations, so the first value needs a
//! full window of history.
//! Unobserved rows produce `None` and leave the recursion state untouched.

/// EMA over the observed values of `values`.
pub fn ema(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let n = values.len();
    let mut result = vec![None; n];
    if period == 0 {
        return result;
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    let mut seed_sum = 0.0;
    let mut seen = 0usize;
    let mut prev: Option<f64> = None;

    for (i, v) in values.iter().enumerate() {
        let Some(x) = v.filter(|x| x.is_finite()) else {
            continue;
        };
        match prev {
            None => {
                seed_sum += x;
                seen += 1;
                if seen == period {
                    let seed = seed_sum / period as f64;
                    prev = Some(seed);
                    result[i] = Some(seed);
                }
            }
            Some(p) => {
                let e = alpha * x + (1.0 - alpha) * p;
                prev = Some(e);
                result[i] = Some(e);
            }
        }
    }
    result
}
