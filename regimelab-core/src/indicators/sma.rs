//! Rolling-window statistics: simple moving average and rolling maximum.
//!
//! A window yields a value only when every row in it is observed; a gap
//! anywhere in the window yields `None`. No partial-window values.

use std::collections::VecDeque;

fn observed(v: Option<f64>) -> Option<f64> {
    v.filter(|x| x.is_finite())
}

/// Rolling mean over `period` rows.
pub fn rolling_mean(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let n = values.len();
    let mut result = vec![None; n];
    if period == 0 || n < period {
        return result;
    }

    let mut sum = 0.0;
    let mut count = 0usize;
    for i in 0..n {
        if let Some(v) = observed(values[i]) {
            sum += v;
            count += 1;
        }
        if i >= period {
            if let Some(v) = observed(values[i - period]) {
                sum -= v;
                count -= 1;
            }
        }
        if count == period {
            result[i] = Some(sum / period as f64);
        }
    }
    result
}

/// Rolling maximum over `period` rows.
///
/// Keeps a deque of candidate indices with decreasing values; the front is
/// the window maximum.
pub fn rolling_max(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let n = values.len();
    let mut result = vec![None; n];
    if period == 0 || n < period {
        return result;
    }

    let mut window: VecDeque<(usize, f64)> = VecDeque::with_capacity(period);
    let mut last_gap: Option<usize> = None;
    for i in 0..n {
        if window.front().is_some_and(|&(j, _)| j + period <= i) {
            window.pop_front();
        }
        match observed(values[i]) {
            Some(x) => {
                while window.back().is_some_and(|&(_, v)| v <= x) {
                    window.pop_back();
                }
                window.push_back((i, x));
            }
            None => last_gap = Some(i),
        }
        let complete = i + 1 >= period && last_gap.map_or(true, |g| g + period <= i);
        if complete {
            result[i] = window.front().map(|&(_, v)| v);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, series, DEFAULT_EPSILON};

    #[test]
    fn sma_5_basic() {
        let result = rolling_mean(&series(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0]), 5);

        assert_eq!(result.len(), 7);
        assert!(result[..4].iter().all(Option::is_none));
        // mean(10..=14) = 12
        assert_approx(result[4].unwrap(), 12.0, DEFAULT_EPSILON);
        assert_approx(result[5].unwrap(), 13.0, DEFAULT_EPSILON);
        assert_approx(result[6].unwrap(), 14.0, DEFAULT_EPSILON);
    }

    #[test]
    fn sma_1_is_identity() {
        let result = rolling_mean(&series(&[100.0, 200.0, 300.0]), 1);
        assert_eq!(result, vec![Some(100.0), Some(200.0), Some(300.0)]);
    }

    #[test]
    fn sma_gap_blanks_every_window_containing_it() {
        let mut values = series(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0]);
        values[2] = None;
        let result = rolling_mean(&values, 3);
        assert!(result[2].is_none());
        assert!(result[3].is_none());
        assert!(result[4].is_none());
        // [13, 14, 15]
        assert_approx(result[5].unwrap(), 14.0, DEFAULT_EPSILON);
    }

    #[test]
    fn sma_too_few_rows() {
        let result = rolling_mean(&series(&[10.0, 11.0]), 5);
        assert!(result.iter().all(Option::is_none));
    }

    #[test]
    fn rolling_max_basic() {
        let result = rolling_max(&series(&[3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0]), 3);
        assert_eq!(
            result,
            vec![None, None, Some(4.0), Some(4.0), Some(5.0), Some(9.0), Some(9.0)]
        );
    }

    #[test]
    fn rolling_max_drops_expired_maximum() {
        let result = rolling_max(&series(&[9.0, 1.0, 2.0, 3.0, 2.0, 1.0]), 3);
        assert_eq!(
            result,
            vec![None, None, Some(9.0), Some(3.0), Some(3.0), Some(3.0)]
        );
    }

    #[test]
    fn rolling_max_gap() {
        let values = vec![Some(3.0), None, Some(4.0), Some(1.0), Some(5.0)];
        let result = rolling_max(&values, 2);
        assert_eq!(result, vec![None, None, None, Some(4.0), Some(5.0)]);
    }
}
