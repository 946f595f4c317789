//! Pluggable difference-order selection.

use super::seasonality::{find_period, num_seasonal_diffs};
use super::stationarity::{num_diffs, KpssConfig};
use std::fmt::Debug;

/// Chooses difference orders for a single series.
///
/// Auto-order transforms call into this for every series independently, so
/// implementations must be pure and thread-safe.
pub trait OrderSelector: Send + Sync + Debug {
    /// Number of lag-1 differences to apply (at most `max_diffs`).
    fn num_diffs(&self, series: &[f64], max_diffs: usize) -> usize;

    /// Number of lag-`period` differences to apply (at most `max_diffs`).
    fn num_seasonal_diffs(&self, series: &[f64], period: usize, max_diffs: usize) -> usize;

    /// Seasonal period of the series, searched in `2..=max_period`.
    fn find_period(&self, series: &[f64], max_period: usize) -> Option<usize>;
}

/// Default selector: KPSS for regular differences, seasonal strength for
/// seasonal differences, autocorrelation peaks for periods.
#[derive(Debug, Clone)]
pub struct StationaritySelector {
    kpss: KpssConfig,
    acf_threshold: f64,
}

impl Default for StationaritySelector {
    fn default() -> Self {
        Self {
            kpss: KpssConfig::default(),
            acf_threshold: 0.3,
        }
    }
}

impl StationaritySelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the KPSS configuration.
    pub fn with_kpss(mut self, kpss: KpssConfig) -> Self {
        self.kpss = kpss;
        self
    }

    /// Set the minimum autocorrelation for a period candidate.
    pub fn with_acf_threshold(mut self, threshold: f64) -> Self {
        self.acf_threshold = threshold.clamp(0.0, 1.0);
        self
    }
}

impl OrderSelector for StationaritySelector {
    fn num_diffs(&self, series: &[f64], max_diffs: usize) -> usize {
        num_diffs(series, max_diffs, &self.kpss)
    }

    fn num_seasonal_diffs(&self, series: &[f64], period: usize, max_diffs: usize) -> usize {
        num_seasonal_diffs(series, period, max_diffs)
    }

    fn find_period(&self, series: &[f64], max_period: usize) -> Option<usize> {
        find_period(series, max_period, self.acf_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn selector_is_object_safe() {
        let selector: Arc<dyn OrderSelector> = Arc::new(StationaritySelector::new());
        let trend: Vec<f64> = (0..100).map(|i| 3.0 * i as f64).collect();
        assert!(selector.num_diffs(&trend, 2) >= 1);
        assert_eq!(selector.find_period(&trend, 10), None);
    }

    #[test]
    fn threshold_is_clamped() {
        let selector = StationaritySelector::new().with_acf_threshold(1.5);
        assert_eq!(selector.acf_threshold, 1.0);
    }
}
