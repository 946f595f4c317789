//! KPSS stationarity test and difference-order selection.

/// Configuration of the KPSS level-stationarity test.
#[derive(Debug, Clone)]
pub struct KpssConfig {
    /// Lags for the HAC variance (default: 4 * (n / 100)^0.25).
    pub lags: Option<usize>,
    /// Statistic above which the series is considered non-stationary.
    pub critical_value: f64,
}

impl Default for KpssConfig {
    fn default() -> Self {
        Self {
            lags: None,
            // 5% critical value for level stationarity
            critical_value: 0.463,
        }
    }
}

impl KpssConfig {
    /// Set the number of HAC lags.
    pub fn with_lags(mut self, lags: usize) -> Self {
        self.lags = Some(lags);
        self
    }

    /// Set the rejection threshold.
    pub fn with_critical_value(mut self, cv: f64) -> Self {
        self.critical_value = cv;
        self
    }
}

/// KPSS statistic for level stationarity.
///
/// Returns `None` when the series has fewer than 4 values, and `Some(0.0)`
/// for a series with no variance.
pub fn kpss_statistic(series: &[f64], lags: Option<usize>) -> Option<f64> {
    let n = series.len();
    if n < 4 {
        return None;
    }

    let lags = lags.unwrap_or_else(|| (4.0 * (n as f64 / 100.0).powf(0.25)).floor() as usize);
    let lags = lags.min(n / 2).max(1);

    let mean: f64 = series.iter().sum::<f64>() / n as f64;
    let residuals: Vec<f64> = series.iter().map(|&x| x - mean).collect();

    let mut cumsum = 0.0;
    let mut numerator = 0.0;
    for &r in &residuals {
        cumsum += r;
        numerator += cumsum * cumsum;
    }
    numerator /= (n * n) as f64;

    // Bartlett-weighted long-run variance
    let mut variance = residuals.iter().map(|&r| r * r).sum::<f64>() / n as f64;
    for j in 1..=lags {
        let weight = 1.0 - j as f64 / (lags + 1) as f64;
        let autocovar: f64 = residuals
            .iter()
            .skip(j)
            .zip(residuals.iter())
            .map(|(&a, &b)| a * b)
            .sum::<f64>()
            / n as f64;
        variance += 2.0 * weight * autocovar;
    }

    if variance <= 1e-12 {
        return Some(0.0);
    }
    Some(numerator / variance)
}

/// Number of first differences (at most `max_diffs`) needed for the KPSS
/// test to stop rejecting stationarity.
pub fn num_diffs(series: &[f64], max_diffs: usize, config: &KpssConfig) -> usize {
    let mut current = series.to_vec();
    for d in 0..max_diffs {
        match kpss_statistic(&current, config.lags) {
            Some(stat) if stat > config.critical_value => {
                current = current.windows(2).map(|w| w[1] - w[0]).collect();
            }
            _ => return d,
        }
    }
    max_diffs
}
