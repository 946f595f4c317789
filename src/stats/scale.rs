//! Location and scale statistics for a single series.
//!
//! All functions skip NaN values so they can run on series that carry
//! leading difference sentinels. An input with no finite values yields NaN.

/// Finite values of a series.
fn valid(values: &[f64]) -> Vec<f64> {
    values.iter().copied().filter(|x| !x.is_nan()).collect()
}

/// Arithmetic mean.
pub fn mean(values: &[f64]) -> f64 {
    let mut n = 0usize;
    let mut sum = 0.0;
    for &x in values.iter().filter(|x| !x.is_nan()) {
        n += 1;
        sum += x;
    }
    if n == 0 {
        return f64::NAN;
    }
    sum / n as f64
}

/// Sample standard deviation (n - 1 denominator). Zero for a single value.
pub fn std_dev(values: &[f64]) -> f64 {
    let v = valid(values);
    match v.len() {
        0 => f64::NAN,
        1 => 0.0,
        n => {
            let m = v.iter().sum::<f64>() / n as f64;
            let var = v.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (n - 1) as f64;
            var.sqrt()
        }
    }
}

/// Minimum and maximum.
pub fn min_max(values: &[f64]) -> (f64, f64) {
    let v = valid(values);
    if v.is_empty() {
        return (f64::NAN, f64::NAN);
    }
    let min = v.iter().copied().fold(f64::INFINITY, f64::min);
    let max = v.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    (min, max)
}

/// Median.
pub fn median(values: &[f64]) -> f64 {
    quantile(values, 0.5)
}

/// Quantile with linear interpolation between order statistics.
pub fn quantile(values: &[f64], q: f64) -> f64 {
    let mut sorted = valid(values);
    if sorted.is_empty() {
        return f64::NAN;
    }
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let n = sorted.len();
    let pos = q.clamp(0.0, 1.0) * (n - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;

    if lower == upper || upper >= n {
        sorted[lower.min(n - 1)]
    } else {
        sorted[lower] * (1.0 - frac) + sorted[upper] * frac
    }
}

/// Interquartile range.
pub fn iqr(values: &[f64]) -> f64 {
    quantile(values, 0.75) - quantile(values, 0.25)
}

/// Median absolute deviation from the median (unscaled).
pub fn mad(values: &[f64]) -> f64 {
    let med = median(values);
    if med.is_nan() {
        return f64::NAN;
    }
    let deviations: Vec<f64> = values
        .iter()
        .filter(|x| !x.is_nan())
        .map(|x| (x - med).abs())
        .collect();
    median(&deviations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn mean_and_std() {
        let series = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert_relative_eq!(mean(&series), 3.0, epsilon = 1e-10);
        assert_relative_eq!(std_dev(&series), 2.5_f64.sqrt(), epsilon = 1e-10);
    }

    #[test]
    fn statistics_skip_nan() {
        let series = vec![f64::NAN, 1.0, 2.0, 3.0];
        assert_relative_eq!(mean(&series), 2.0, epsilon = 1e-10);
        assert_relative_eq!(std_dev(&series), 1.0, epsilon = 1e-10);
        assert_eq!(min_max(&series), (1.0, 3.0));
        assert_relative_eq!(median(&series), 2.0, epsilon = 1e-10);
    }

    #[test]
    fn empty_and_all_nan_are_nan() {
        assert!(mean(&[]).is_nan());
        assert!(std_dev(&[f64::NAN]).is_nan());
        assert!(median(&[]).is_nan());
        assert!(mad(&[f64::NAN, f64::NAN]).is_nan());
    }

    #[test]
    fn single_value_has_zero_spread() {
        assert_relative_eq!(std_dev(&[4.0]), 0.0, epsilon = 1e-12);
        assert_relative_eq!(iqr(&[4.0]), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn quantiles_interpolate() {
        let series = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0];
        assert_relative_eq!(median(&series), 5.0, epsilon = 1e-10);
        assert_relative_eq!(quantile(&series, 0.25), 3.0, epsilon = 1e-10);
        assert_relative_eq!(iqr(&series), 4.0, epsilon = 1e-10);
        assert_relative_eq!(quantile(&[1.0, 2.0], 0.5), 1.5, epsilon = 1e-10);
    }

    #[test]
    fn mad_ignores_outlier() {
        let series = vec![1.0, 2.0, 3.0, 4.0, 1000.0];
        // deviations from 3: [2, 1, 0, 1, 997]
        assert_relative_eq!(mad(&series), 1.0, epsilon = 1e-10);
    }
}
