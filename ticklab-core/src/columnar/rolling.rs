//! Trailing-window statistics over raw value series.
//!
//! All functions are row-aligned with their input and use NaN as the
//! missing marker: positions with fewer than `window` observations behind
//! them (or any NaN inside the window) yield NaN, never zero.

/// Trailing simple moving average over `window` consecutive values.
///
/// The first `window - 1` outputs are NaN.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    assert!(window >= 1, "rolling window must be >= 1");

    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if n < window {
        return result;
    }

    for i in (window - 1)..n {
        let slice = &values[(i + 1 - window)..=i];
        if slice.iter().any(|v| v.is_nan()) {
            continue;
        }
        result[i] = slice.iter().sum::<f64>() / window as f64;
    }

    result
}

/// Trailing sample standard deviation (divide by `window - 1`) over
/// `window` consecutive values.
///
/// The first `window - 1` outputs are NaN, as is any window containing a
/// NaN. A window of 1 has no defined sample deviation and yields NaN
/// throughout.
pub fn rolling_std(values: &[f64], window: usize) -> Vec<f64> {
    assert!(window >= 1, "rolling window must be >= 1");

    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if n < window {
        return result;
    }

    for i in (window - 1)..n {
        let slice = &values[(i + 1 - window)..=i];
        if slice.iter().any(|v| v.is_nan()) {
            continue;
        }
        let mean = slice.iter().sum::<f64>() / window as f64;
        let sum_sq: f64 = slice
            .iter()
            .map(|v| {
                let diff = v - mean;
                diff * diff
            })
            .sum();
        result[i] = (sum_sq / (window as f64 - 1.0)).sqrt();
    }

    result
}

/// Fractional change between consecutive values: `(v[i] - v[i-1]) / v[i-1]`.
///
/// The first output is NaN — there is no prior observation.
pub fn pct_change(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    for i in 1..n {
        result[i] = (values[i] - values[i - 1]) / values[i - 1];
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-10,
            "assert_approx failed: actual={actual}, expected={expected}"
        );
    }

    #[test]
    fn rolling_mean_basic() {
        let result = rolling_mean(&[10.0, 11.0, 12.0, 13.0, 14.0], 3);
        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        assert_approx(result[2], 11.0);
        assert_approx(result[3], 12.0);
        assert_approx(result[4], 13.0);
    }

    #[test]
    fn rolling_mean_window_one_is_identity() {
        let result = rolling_mean(&[100.0, 200.0, 300.0], 1);
        assert_approx(result[0], 100.0);
        assert_approx(result[1], 200.0);
        assert_approx(result[2], 300.0);
    }

    #[test]
    fn rolling_mean_too_few_values() {
        let result = rolling_mean(&[10.0, 11.0], 5);
        assert!(result.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn rolling_mean_nan_propagation() {
        let result = rolling_mean(&[10.0, f64::NAN, 12.0, 13.0, 14.0], 2);
        assert!(result[0].is_nan());
        assert!(result[1].is_nan()); // window [10, NaN]
        assert!(result[2].is_nan()); // window [NaN, 12]
        assert_approx(result[3], 12.5);
        assert_approx(result[4], 13.5);
    }

    #[test]
    fn rolling_std_matches_sample_formula() {
        // Sample stddev of [1, 2, 3] = 1; of [2, 3, 4] = 1.
        let result = rolling_std(&[1.0, 2.0, 3.0, 4.0], 3);
        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        assert_approx(result[2], 1.0);
        assert_approx(result[3], 1.0);
    }

    #[test]
    fn rolling_std_constant_series_is_zero() {
        let result = rolling_std(&[5.0, 5.0, 5.0, 5.0], 2);
        assert!(result[0].is_nan());
        assert_approx(result[1], 0.0);
        assert_approx(result[2], 0.0);
        assert_approx(result[3], 0.0);
    }

    #[test]
    fn rolling_std_window_one_is_undefined() {
        let result = rolling_std(&[1.0, 2.0, 3.0], 1);
        assert!(result.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn pct_change_basic() {
        let result = pct_change(&[100.0, 110.0, 99.0]);
        assert!(result[0].is_nan());
        assert_approx(result[1], 0.1);
        assert_approx(result[2], -0.1);
    }

    #[test]
    fn pct_change_single_value() {
        let result = pct_change(&[100.0]);
        assert_eq!(result.len(), 1);
        assert!(result[0].is_nan());
    }

    #[test]
    fn std_of_returns_composes_with_pct_change() {
        // Prices 100 → 110 → 121 have constant +10% returns, so a 2-window
        // stddev over the return series is 0 once two returns exist.
        let returns = pct_change(&[100.0, 110.0, 121.0]);
        let vol = rolling_std(&returns, 2);
        assert!(vol[0].is_nan());
        assert!(vol[1].is_nan()); // window covers the undefined first return
        assert_approx(vol[2], 0.0);
    }
}
