//! Seasonal strength, seasonal difference counts, and period search.

/// Seasonal strength above which a seasonal difference is applied.
pub const SEASONAL_STRENGTH_THRESHOLD: f64 = 0.64;

/// Strength of seasonality at `period` (0 to 1), from a classical additive
/// decomposition: centered moving-average trend, per-phase mean seasonal
/// component, remainder.
///
/// Returns 0 when the series covers fewer than two full periods.
pub fn seasonal_strength(series: &[f64], period: usize) -> f64 {
    let n = series.len();
    if period < 2 || n < 2 * period {
        return 0.0;
    }

    let trend = centered_moving_average(series, period);

    // Per-phase means of the detrended values
    let mut phase_sum = vec![0.0; period];
    let mut phase_count = vec![0usize; period];
    for (i, (&x, t)) in series.iter().zip(&trend).enumerate() {
        if let Some(t) = t {
            phase_sum[i % period] += x - t;
            phase_count[i % period] += 1;
        }
    }
    let mut seasonal: Vec<f64> = phase_sum
        .iter()
        .zip(&phase_count)
        .map(|(&s, &c)| if c > 0 { s / c as f64 } else { 0.0 })
        .collect();
    let offset = seasonal.iter().sum::<f64>() / period as f64;
    for s in &mut seasonal {
        *s -= offset;
    }

    let mut remainder = Vec::with_capacity(n);
    let mut seasonal_plus_remainder = Vec::with_capacity(n);
    for (i, (&x, t)) in series.iter().zip(&trend).enumerate() {
        if let Some(t) = t {
            let detrended = x - t;
            remainder.push(detrended - seasonal[i % period]);
            seasonal_plus_remainder.push(detrended);
        }
    }

    let var_sr = variance(&seasonal_plus_remainder);
    if var_sr < 1e-10 {
        return 0.0;
    }
    (1.0 - variance(&remainder) / var_sr).clamp(0.0, 1.0)
}

/// Number of seasonal differences (at most `max_diffs`) applied while the
/// seasonal strength stays above [`SEASONAL_STRENGTH_THRESHOLD`].
pub fn num_seasonal_diffs(series: &[f64], period: usize, max_diffs: usize) -> usize {
    let mut current = series.to_vec();
    for d in 0..max_diffs {
        if seasonal_strength(&current, period) < SEASONAL_STRENGTH_THRESHOLD {
            return d;
        }
        current = current
            .iter()
            .skip(period)
            .zip(current.iter())
            .map(|(curr, prev)| curr - prev)
            .collect();
    }
    max_diffs
}

/// Most likely seasonal period in `2..=max_period`.
///
/// The series is first differenced once so that trends do not mask the
/// autocorrelation peaks. The period is the lag of the highest local maximum
/// of the autocorrelation function above `threshold`.
pub fn find_period(series: &[f64], max_period: usize, threshold: f64) -> Option<usize> {
    let diffed: Vec<f64> = series.windows(2).map(|w| w[1] - w[0]).collect();
    let n = diffed.len();
    let min_lag = 2;
    let max_lag = max_period.min(n / 2);
    if max_lag < min_lag {
        return None;
    }

    let mean = diffed.iter().sum::<f64>() / n as f64;
    let var = diffed.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;
    if var < 1e-10 {
        return None;
    }

    // acf[k] holds the autocorrelation at lag k + min_lag - 1
    let acf: Vec<f64> = (min_lag - 1..=max_lag + 1)
        .map(|lag| autocorrelation(&diffed, lag, mean, var))
        .collect();

    let mut best: Option<(usize, f64)> = None;
    for k in 1..acf.len() - 1 {
        let value = acf[k];
        if value > acf[k - 1] && value > acf[k + 1] && value > threshold {
            let lag = k + min_lag - 1;
            if best.is_none_or(|(_, b)| value > b) {
                best = Some((lag, value));
            }
        }
    }
    best.map(|(lag, _)| lag)
}

/// Centered moving average of width `period` (2 x period when even).
fn centered_moving_average(series: &[f64], period: usize) -> Vec<Option<f64>> {
    let n = series.len();
    let half = period / 2;
    let mut out = vec![None; n];
    for (i, slot) in out.iter_mut().enumerate().take(n.saturating_sub(half)).skip(half) {
        let value = if period % 2 == 1 {
            series[i - half..=i + half].iter().sum::<f64>() / period as f64
        } else {
            let inner: f64 = series[i - half + 1..i + half].iter().sum();
            (0.5 * series[i - half] + inner + 0.5 * series[i + half]) / period as f64
        };
        *slot = Some(value);
    }
    out
}

fn autocorrelation(series: &[f64], lag: usize, mean: f64, variance: f64) -> f64 {
    let n = series.len();
    if lag >= n {
        return 0.0;
    }
    let covariance: f64 = series
        .iter()
        .take(n - lag)
        .zip(series.iter().skip(lag))
        .map(|(x1, x2)| (x1 - mean) * (x2 - mean))
        .sum::<f64>()
        / n as f64;
    covariance / variance
}

fn variance(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let mean: f64 = values.iter().sum::<f64>() / n as f64;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64
}
