//! Differencing with a per-series order chosen from the data.

use super::differences::{difference, difference_after, integrate_after};
use super::traits::{check_n_groups, first_part, take_positions, GroupedTransform};
use crate::core::{GroupedArray, ParallelConfig};
use crate::error::{Result, TransformError};
use crate::stats::{OrderSelector, StationaritySelector};
use std::sync::Arc;
use tracing::{debug, warn};

/// How the difference orders of each series are searched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSearch {
    /// Lag-1 differences, as many as the selector asks for.
    NonSeasonal,
    /// Lag-`season_length` differences, as many as the selector asks for.
    Seasonal { season_length: usize },
    /// At every level, find the season length of the series and apply one
    /// seasonal difference if the selector asks for it.
    SeasonalityAndDifferences { max_season_length: usize },
}

/// One difference level across all series.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffLevel {
    lags: Vec<usize>,
    tails: GroupedArray,
}

impl DiffLevel {
    /// Lag applied to every series at this level (`0` = not differenced).
    pub fn lags(&self) -> &[usize] {
        &self.lags
    }

    /// Last `lags[i]` input values of series `i`.
    pub fn tails(&self) -> &GroupedArray {
        &self.tails
    }
}

/// Chosen lags and stored tails of one series.
struct SeriesFit {
    output: Vec<f64>,
    lags: Vec<usize>,
    tails: Vec<Vec<f64>>,
}

/// Finds and applies the number of differences of every series.
///
/// Each series gets its own order profile, so different series may be
/// differenced a different number of times or by different lags. Fitted
/// values cannot be restored (`inverse_transform_fitted` is not supported).
#[derive(Debug, Clone)]
pub struct AutoDifferences {
    search: OrderSearch,
    max_diffs: usize,
    n_seasons: Option<usize>,
    selector: Arc<dyn OrderSelector>,
    parallel: ParallelConfig,
    levels: Option<Vec<DiffLevel>>,
}

impl AutoDifferences {
    /// Apply up to `max_diffs` lag-1 differences per series.
    pub fn new(max_diffs: usize) -> Result<Self> {
        Self::with_search(OrderSearch::NonSeasonal, max_diffs)
    }

    /// Apply up to `max_diffs` seasonal differences of `season_length` per series.
    pub fn seasonal(season_length: usize, max_diffs: usize) -> Result<Self> {
        Self::with_search(OrderSearch::Seasonal { season_length }, max_diffs)
    }

    /// Find the season length and apply up to `max_diffs` seasonal
    /// differences per series.
    pub fn seasonality_and_differences(max_season_length: usize, max_diffs: usize) -> Result<Self> {
        Self::with_search(
            OrderSearch::SeasonalityAndDifferences { max_season_length },
            max_diffs,
        )
    }

    /// Create a transform with an explicit search mode.
    pub fn with_search(search: OrderSearch, max_diffs: usize) -> Result<Self> {
        if max_diffs == 0 {
            return Err(TransformError::InvalidParameter(
                "max_diffs must be positive".to_string(),
            ));
        }
        match search {
            OrderSearch::Seasonal { season_length: p }
            | OrderSearch::SeasonalityAndDifferences {
                max_season_length: p,
            } if p < 2 => {
                return Err(TransformError::InvalidParameter(format!(
                    "season length must be at least 2, got {p}"
                )));
            }
            _ => {}
        }
        Ok(Self {
            search,
            max_diffs,
            n_seasons: Some(10),
            selector: Arc::new(StationaritySelector::default()),
            parallel: ParallelConfig::default(),
            levels: None,
        })
    }

    /// Number of seasons used by seasonal searches (`None` = whole series).
    pub fn with_n_seasons(mut self, n_seasons: Option<usize>) -> Self {
        self.n_seasons = n_seasons;
        self
    }

    /// Replace the order-selection kernel.
    pub fn with_selector(mut self, selector: Arc<dyn OrderSelector>) -> Self {
        self.selector = selector;
        self
    }

    /// Set the parallel configuration.
    pub fn with_parallel(mut self, parallel: ParallelConfig) -> Self {
        self.parallel = parallel;
        self
    }

    /// Set the number of worker threads.
    pub fn with_num_threads(self, num_threads: usize) -> Self {
        self.with_parallel(ParallelConfig::new(num_threads))
    }

    pub fn search(&self) -> OrderSearch {
        self.search
    }

    pub fn max_diffs(&self) -> usize {
        self.max_diffs
    }

    /// Fitted difference levels, `max_diffs` of them.
    pub fn levels(&self) -> Option<&[DiffLevel]> {
        self.levels.as_deref()
    }

    /// Lags applied to every series, in order, skipping unused levels.
    pub fn selected_lags(&self) -> Option<Vec<Vec<usize>>> {
        let levels = self.levels.as_ref()?;
        let n = levels.first().map_or(0, |l| l.lags.len());
        Some(
            (0..n)
                .map(|i| {
                    levels
                        .iter()
                        .map(|l| l.lags[i])
                        .filter(|&lag| lag > 0)
                        .collect()
                })
                .collect(),
        )
    }

    fn fitted_levels(&self) -> Result<&[DiffLevel]> {
        self.levels.as_deref().ok_or(TransformError::FitRequired)
    }

    /// Values used by a seasonal search with the given period.
    fn window<'a>(&self, values: &'a [f64], period: usize) -> &'a [f64] {
        match self.n_seasons {
            Some(n) => &values[values.len().saturating_sub(n.saturating_mul(period))..],
            None => values,
        }
    }

    /// Order profile of one series, chosen on its non-sentinel values.
    fn select_lags(&self, values: &[f64]) -> Vec<usize> {
        let start = values.iter().position(|x| !x.is_nan()).unwrap_or(values.len());
        let valid = &values[start..];

        let mut lags = match self.search {
            OrderSearch::NonSeasonal => {
                let k = self.selector.num_diffs(valid, self.max_diffs);
                vec![1; k.min(self.max_diffs)]
            }
            OrderSearch::Seasonal { season_length } => {
                let window = self.window(valid, season_length);
                let k = self
                    .selector
                    .num_seasonal_diffs(window, season_length, self.max_diffs);
                vec![season_length; k.min(self.max_diffs)]
            }
            OrderSearch::SeasonalityAndDifferences { max_season_length } => {
                self.search_periods(valid, max_season_length)
            }
        };

        // At least one value must survive all levels
        let mut total = 0;
        let keep = lags
            .iter()
            .take_while(|&&lag| {
                total += lag;
                total < valid.len()
            })
            .count();
        if keep < lags.len() {
            warn!(
                selected = ?lags,
                len = valid.len(),
                "series too short for selected differences, truncating"
            );
            lags.truncate(keep);
        }
        lags
    }

    fn search_periods(&self, valid: &[f64], max_season_length: usize) -> Vec<usize> {
        let mut lags = Vec::new();
        let mut current = valid.to_vec();
        for _ in 0..self.max_diffs {
            let window = self.window(&current, max_season_length);
            let Some(period) = self.selector.find_period(window, max_season_length) else {
                break;
            };
            if period == 0
                || period >= current.len()
                || self.selector.num_seasonal_diffs(window, period, 1) == 0
            {
                break;
            }
            current = current
                .iter()
                .skip(period)
                .zip(current.iter())
                .map(|(curr, prev)| curr - prev)
                .collect();
            lags.push(period);
        }
        lags
    }

    fn fit_series(&self, values: &[f64]) -> SeriesFit {
        let lags = self.select_lags(values);
        let mut output = values.to_vec();
        let mut tails = Vec::with_capacity(lags.len());
        for &lag in &lags {
            tails.push(output[output.len() - lag..].to_vec());
            output = difference(&output, lag);
        }
        SeriesFit {
            output,
            lags,
            tails,
        }
    }
}

impl GroupedTransform for AutoDifferences {
    fn name(&self) -> &str {
        match self.search {
            OrderSearch::NonSeasonal => "AutoDifferences",
            OrderSearch::Seasonal { .. } => "AutoSeasonalDifferences",
            OrderSearch::SeasonalityAndDifferences { .. } => "AutoSeasonalityAndDifferences",
        }
    }

    fn is_fitted(&self) -> bool {
        self.levels.is_some()
    }

    fn fit_transform(&mut self, ga: &GroupedArray) -> Result<GroupedArray> {
        let fits = self.parallel.map_groups(ga, |_, g| self.fit_series(g))?;

        let levels = (0..self.max_diffs)
            .map(|l| {
                let lags = fits
                    .iter()
                    .map(|f| f.lags.get(l).copied().unwrap_or(0))
                    .collect();
                let tails: Vec<&[f64]> = fits
                    .iter()
                    .map(|f| f.tails.get(l).map_or(&[][..], Vec::as_slice))
                    .collect();
                DiffLevel {
                    lags,
                    tails: GroupedArray::from_groups(&tails),
                }
            })
            .collect();

        let outputs: Vec<&[f64]> = fits.iter().map(|f| f.output.as_slice()).collect();
        let out = ga.with_data(outputs.concat())?;

        debug!(
            n_series = ga.n_groups(),
            search = ?self.search,
            n_differenced = fits.iter().filter(|f| !f.lags.is_empty()).count(),
            "fitted automatic differences"
        );
        self.levels = Some(levels);
        Ok(out)
    }

    fn update(&self, ga: &GroupedArray) -> Result<GroupedArray> {
        let levels = self.fitted_levels()?;
        check_n_groups(levels[0].lags.len(), ga)?;
        let mut current = ga.clone();
        for level in levels {
            current = self
                .parallel
                .map_values(&current, |i, g| difference_after(level.tails.group(i), g))?;
        }
        Ok(current)
    }

    fn inverse_transform(&self, ga: &GroupedArray) -> Result<GroupedArray> {
        let levels = self.fitted_levels()?;
        check_n_groups(levels[0].lags.len(), ga)?;
        let mut current = ga.clone();
        for level in levels.iter().rev() {
            current = self
                .parallel
                .map_values(&current, |i, g| integrate_after(level.tails.group(i), g))?;
        }
        Ok(current)
    }

    fn inverse_transform_fitted(&self, _ga: &GroupedArray) -> Result<GroupedArray> {
        Err(TransformError::NotSupported(format!(
            "{} cannot restore fitted values",
            self.name()
        )))
    }

    fn take(&self, idxs: &[usize]) -> Result<Self> {
        let levels = self
            .fitted_levels()?
            .iter()
            .map(|level| {
                Ok(DiffLevel {
                    lags: take_positions(&level.lags, idxs)?,
                    tails: level.tails.take(idxs)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            levels: Some(levels),
            ..self.clone_config()
        })
    }

    fn stack_refs(parts: &[&Self]) -> Result<Self> {
        let first = first_part(parts)?;
        if parts
            .iter()
            .any(|p| {
                p.search != first.search
                    || p.max_diffs != first.max_diffs
                    || p.n_seasons != first.n_seasons
            })
        {
            return Err(TransformError::InvalidParameter(
                "cannot stack automatic differences with different configurations".to_string(),
            ));
        }
        let fitted = parts
            .iter()
            .map(|p| p.fitted_levels())
            .collect::<Result<Vec<_>>>()?;

        let levels = (0..first.max_diffs)
            .map(|l| DiffLevel {
                lags: fitted.iter().flat_map(|f| f[l].lags.iter().copied()).collect(),
                tails: GroupedArray::concat(fitted.iter().map(|f| &f[l].tails)),
            })
            .collect();

        debug!(n_parts = parts.len(), "stacked automatic differences");
        Ok(Self {
            levels: Some(levels),
            ..first.clone_config()
        })
    }
}

impl AutoDifferences {
    /// Copy of the configuration without fitted state.
    fn clone_config(&self) -> Self {
        Self {
            search: self.search,
            max_diffs: self.max_diffs,
            n_seasons: self.n_seasons,
            selector: Arc::clone(&self.selector),
            parallel: self.parallel.clone(),
            levels: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;
    use std::sync::Mutex;

    /// Selector returning fixed answers, to test the engine independently of
    /// the statistics.
    #[derive(Debug)]
    struct FixedSelector {
        diffs: usize,
        period: Option<usize>,
    }

    impl OrderSelector for FixedSelector {
        fn num_diffs(&self, series: &[f64], max_diffs: usize) -> usize {
            // Difference only trending series (first value below last)
            if series.first() < series.last() {
                self.diffs.min(max_diffs)
            } else {
                0
            }
        }

        fn num_seasonal_diffs(&self, _series: &[f64], _period: usize, max_diffs: usize) -> usize {
            self.diffs.min(max_diffs)
        }

        fn find_period(&self, _series: &[f64], _max_period: usize) -> Option<usize> {
            self.period
        }
    }

    fn trend(n: usize) -> Vec<f64> {
        (0..n).map(|i| 10.0 + 2.0 * i as f64).collect()
    }

    fn seasonal(n: usize, period: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 50.0 + 10.0 * (2.0 * PI * i as f64 / period as f64).sin())
            .collect()
    }

    fn assert_close(a: &[f64], b: &[f64]) {
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b) {
            assert_relative_eq!(x, y, epsilon = 1e-8);
        }
    }

    #[test]
    fn rejects_bad_configuration() {
        assert!(AutoDifferences::new(0).is_err());
        assert!(AutoDifferences::seasonal(1, 1).is_err());
        assert!(AutoDifferences::seasonality_and_differences(0, 1).is_err());
        assert!(AutoDifferences::seasonal(7, 2).is_ok());
    }

    #[test]
    fn series_get_independent_orders() {
        let selector = Arc::new(FixedSelector {
            diffs: 2,
            period: None,
        });
        let mut auto = AutoDifferences::new(2).unwrap().with_selector(selector);
        let flat = vec![5.0, 4.0, 5.0, 4.0, 3.0];
        let ga = GroupedArray::from_groups(&[trend(10), flat.clone()]);
        let out = auto.fit_transform(&ga).unwrap();

        assert_eq!(auto.selected_lags().unwrap(), vec![vec![1, 1], vec![]]);
        assert!(out.group(0)[..2].iter().all(|x| x.is_nan()));
        assert!(out.group(0)[2..].iter().all(|&x| x.abs() < 1e-12));
        assert_eq!(out.group(1), flat.as_slice());
    }

    #[test]
    fn update_then_inverse_recovers_values() {
        let selector = Arc::new(FixedSelector {
            diffs: 1,
            period: Some(4),
        });
        let mut auto = AutoDifferences::seasonal(4, 1).unwrap().with_selector(selector);
        let ga = GroupedArray::from_groups(&[seasonal(16, 4), trend(12)]);
        auto.fit_transform(&ga).unwrap();

        let new = GroupedArray::from_groups(&[seasonal(22, 4)[16..].to_vec(), vec![34.0, 36.0]]);
        let updated = auto.update(&new).unwrap();
        // A pure seasonal pattern is removed by one seasonal difference
        assert!(updated.group(0).iter().all(|x| x.abs() < 1e-9));
        let restored = auto.inverse_transform(&updated).unwrap();
        assert_close(restored.data(), new.data());
    }

    #[test]
    fn inverse_continues_trend() {
        let mut auto = AutoDifferences::new(1).unwrap();
        let ga = GroupedArray::from_groups(&[trend(100)]);
        auto.fit_transform(&ga).unwrap();
        assert_eq!(auto.selected_lags().unwrap(), vec![vec![1]]);

        let restored = auto
            .inverse_transform(&GroupedArray::from_groups(&[vec![2.0, 2.0]]))
            .unwrap();
        assert_close(restored.data(), &[210.0, 212.0]);
    }

    #[test]
    fn short_series_keep_one_value() {
        let selector = Arc::new(FixedSelector {
            diffs: 3,
            period: None,
        });
        let mut auto = AutoDifferences::new(3).unwrap().with_selector(selector);
        let ga = GroupedArray::from_groups(&[vec![1.0, 2.0, 4.0]]);
        let out = auto.fit_transform(&ga).unwrap();
        assert_eq!(auto.selected_lags().unwrap(), vec![vec![1, 1]]);
        assert!(out.data()[2].is_finite());
    }

    #[test]
    fn seasonality_search_uses_found_period() {
        let selector = Arc::new(FixedSelector {
            diffs: 1,
            period: Some(3),
        });
        let mut auto = AutoDifferences::seasonality_and_differences(6, 2)
            .unwrap()
            .with_selector(selector);
        let ga = GroupedArray::from_groups(&[trend(20)]);
        auto.fit_transform(&ga).unwrap();
        assert_eq!(auto.selected_lags().unwrap(), vec![vec![3, 3]]);
        assert_eq!(auto.name(), "AutoSeasonalityAndDifferences");
    }

    #[test]
    fn default_selector_finds_seasonal_period() {
        let mut auto = AutoDifferences::seasonality_and_differences(12, 1).unwrap();
        let ga = GroupedArray::from_groups(&[seasonal(120, 7)]);
        auto.fit_transform(&ga).unwrap();
        assert_eq!(auto.selected_lags().unwrap(), vec![vec![7]]);
    }

    #[test]
    fn inverse_transform_fitted_not_supported() {
        let mut auto = AutoDifferences::new(1).unwrap();
        let ga = GroupedArray::from_groups(&[trend(30)]);
        let out = auto.fit_transform(&ga).unwrap();
        assert!(matches!(
            auto.inverse_transform_fitted(&out),
            Err(TransformError::NotSupported(_))
        ));
    }

    #[test]
    fn take_then_stack_reproduces_state() {
        let selector = Arc::new(FixedSelector {
            diffs: 2,
            period: None,
        });
        let mut auto = AutoDifferences::new(2).unwrap().with_selector(selector);
        let ga = GroupedArray::from_groups(&[trend(10), vec![3.0, 2.0, 1.0], trend(6)]);
        auto.fit_transform(&ga).unwrap();

        let stacked =
            AutoDifferences::stack(&[auto.take(&[0]).unwrap(), auto.take(&[1, 2]).unwrap()])
                .unwrap();
        assert_eq!(stacked.levels(), auto.levels());
    }

    #[test]
    fn stack_rejects_mixed_searches() {
        let ga = GroupedArray::from_groups(&[trend(30)]);
        let mut a = AutoDifferences::new(1).unwrap();
        let mut b = AutoDifferences::seasonal(4, 1).unwrap();
        a.fit_transform(&ga).unwrap();
        b.fit_transform(&ga).unwrap();
        assert!(matches!(
            AutoDifferences::stack(&[a, b]),
            Err(TransformError::InvalidParameter(_))
        ));
    }

    #[test]
    fn stack_rejects_different_windows() {
        let ga = GroupedArray::from_groups(&[trend(30)]);
        let mut a = AutoDifferences::seasonal(4, 1).unwrap();
        let mut b = AutoDifferences::seasonal(4, 1)
            .unwrap()
            .with_n_seasons(Some(3));
        a.fit_transform(&ga).unwrap();
        b.fit_transform(&ga).unwrap();
        assert!(matches!(
            AutoDifferences::stack(&[a, b]),
            Err(TransformError::InvalidParameter(_))
        ));
    }

    /// Selector recording the length of every series it is shown.
    #[derive(Debug, Default)]
    struct RecordingSelector {
        lengths: Mutex<Vec<usize>>,
    }

    impl RecordingSelector {
        fn record(&self, series: &[f64]) {
            self.lengths.lock().unwrap().push(series.len());
        }

        fn lengths(&self) -> Vec<usize> {
            self.lengths.lock().unwrap().clone()
        }
    }

    impl OrderSelector for RecordingSelector {
        fn num_diffs(&self, series: &[f64], _max_diffs: usize) -> usize {
            self.record(series);
            0
        }

        fn num_seasonal_diffs(&self, series: &[f64], _period: usize, _max_diffs: usize) -> usize {
            self.record(series);
            0
        }

        fn find_period(&self, series: &[f64], _max_period: usize) -> Option<usize> {
            self.record(series);
            None
        }
    }

    fn seen_lengths(auto: AutoDifferences, series: Vec<f64>) -> Vec<usize> {
        let recorder = Arc::new(RecordingSelector::default());
        let mut auto = auto.with_selector(recorder.clone());
        auto.fit_transform(&GroupedArray::from_groups(&[series]))
            .unwrap();
        recorder.lengths()
    }

    #[test]
    fn seasonal_search_uses_trailing_seasons() {
        let bounded = AutoDifferences::seasonal(4, 1)
            .unwrap()
            .with_n_seasons(Some(3));
        assert_eq!(seen_lengths(bounded, trend(40)), vec![12]);

        let full = AutoDifferences::seasonal(4, 1).unwrap().with_n_seasons(None);
        assert_eq!(seen_lengths(full, trend(40)), vec![40]);

        // Longer windows are clipped to the series
        let long = AutoDifferences::seasonal(4, 1)
            .unwrap()
            .with_n_seasons(Some(20));
        assert_eq!(seen_lengths(long, trend(40)), vec![40]);
    }

    #[test]
    fn window_skips_leading_nan() {
        let mut series = vec![f64::NAN; 3];
        series.extend(trend(20));
        let full = AutoDifferences::seasonal(4, 1).unwrap().with_n_seasons(None);
        assert_eq!(seen_lengths(full, series.clone()), vec![20]);

        let non_seasonal = AutoDifferences::new(1).unwrap();
        assert_eq!(seen_lengths(non_seasonal, series), vec![20]);
    }

    #[test]
    fn period_search_uses_max_season_length_window() {
        let bounded = AutoDifferences::seasonality_and_differences(5, 1)
            .unwrap()
            .with_n_seasons(Some(2));
        assert_eq!(seen_lengths(bounded, trend(40)), vec![10]);

        let full = AutoDifferences::seasonality_and_differences(5, 1)
            .unwrap()
            .with_n_seasons(None);
        assert_eq!(seen_lengths(full, trend(40)), vec![40]);
    }

    #[test]
    fn shortest_season_length_is_searched() {
        let alternating: Vec<f64> = (0..60)
            .map(|i| if i % 2 == 0 { 11.0 } else { 9.0 })
            .collect();
        let mut auto = AutoDifferences::seasonality_and_differences(2, 1).unwrap();
        let out = auto
            .fit_transform(&GroupedArray::from_groups(&[alternating]))
            .unwrap();
        assert_eq!(auto.selected_lags().unwrap(), vec![vec![2]]);
        assert!(out.data()[2..].iter().all(|x| x.abs() < 1e-12));
    }

    #[test]
    fn update_checks_series_count() {
        let mut auto = AutoDifferences::new(1).unwrap();
        auto.fit_transform(&GroupedArray::from_groups(&[trend(30)]))
            .unwrap();
        let ga = GroupedArray::from_groups(&[vec![1.0], vec![2.0]]);
        assert_eq!(
            auto.update(&ga),
            Err(TransformError::ShapeMismatch {
                expected: 1,
                got: 2
            })
        );
    }
}
