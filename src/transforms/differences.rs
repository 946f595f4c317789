//! Sequential differencing of every series by fixed lags.

use super::traits::{check_n_groups, first_part, GroupedTransform};
use crate::core::{GroupedArray, ParallelConfig};
use crate::error::{Result, TransformError};
use tracing::debug;

/// Difference a series by `lag`.
///
/// `out[t] = x[t] - x[t - lag]`; the first `lag` positions are NaN.
pub(crate) fn difference(series: &[f64], lag: usize) -> Vec<f64> {
    if lag == 0 {
        return series.to_vec();
    }
    series
        .iter()
        .enumerate()
        .map(|(t, &x)| if t < lag { f64::NAN } else { x - series[t - lag] })
        .collect()
}

/// Difference new values against the `lag = tail.len()` values preceding them.
///
/// An empty tail leaves the values unchanged.
pub(crate) fn difference_after(tail: &[f64], series: &[f64]) -> Vec<f64> {
    let lag = tail.len();
    if lag == 0 {
        return series.to_vec();
    }
    series
        .iter()
        .enumerate()
        .map(|(t, &x)| {
            let prev = if t < lag { tail[t] } else { series[t - lag] };
            x - prev
        })
        .collect()
}

/// Integrate differenced values, continuing from the `lag = tail.len()`
/// values preceding them.
pub(crate) fn integrate_after(tail: &[f64], differenced: &[f64]) -> Vec<f64> {
    let lag = tail.len();
    if lag == 0 {
        return differenced.to_vec();
    }
    let mut out: Vec<f64> = Vec::with_capacity(differenced.len());
    for (t, &y) in differenced.iter().enumerate() {
        let prev = if t < lag { tail[t] } else { out[t - lag] };
        out.push(y + prev);
    }
    out
}

/// Subtracts lagged values of each series, once per configured order.
///
/// Orders are applied in sequence. After fitting, the last `d` values seen by
/// each order are kept per series so that new observations can be
/// differenced (`update`) and forecasts integrated back (`inverse_transform`)
/// without the training data.
///
/// # Example
///
/// ```
/// use target_transforms::core::GroupedArray;
/// use target_transforms::transforms::{Differences, GroupedTransform};
///
/// let ga = GroupedArray::from_groups(&[vec![1.0, 3.0, 6.0, 10.0]]);
/// let mut diffs = Differences::new([1]).unwrap();
/// let out = diffs.fit_transform(&ga).unwrap();
/// assert!(out.data()[0].is_nan());
/// assert_eq!(&out.data()[1..], &[2.0, 3.0, 4.0]);
///
/// let forecast = GroupedArray::from_groups(&[vec![5.0, 6.0]]);
/// let restored = diffs.inverse_transform(&forecast).unwrap();
/// assert_eq!(restored.data(), &[15.0, 21.0]);
/// ```
#[derive(Debug, Clone)]
pub struct Differences {
    orders: Vec<usize>,
    store_fitted: bool,
    parallel: ParallelConfig,
    state: Option<DifferencesState>,
}

#[derive(Debug, Clone)]
struct DifferencesState {
    /// Last `d` input values per series, one array per order.
    tails: Vec<GroupedArray>,
    /// Input of every order at fit time; all share the fit layout.
    fitted: Option<Vec<GroupedArray>>,
}

impl Differences {
    /// Create a transform applying the given lags in order.
    ///
    /// Fails if the list is empty or contains a zero lag.
    pub fn new<I: IntoIterator<Item = usize>>(orders: I) -> Result<Self> {
        let orders: Vec<usize> = orders.into_iter().collect();
        if orders.is_empty() {
            return Err(TransformError::InvalidParameter(
                "at least one difference order is required".to_string(),
            ));
        }
        if orders.contains(&0) {
            return Err(TransformError::InvalidParameter(
                "difference orders must be positive".to_string(),
            ));
        }
        Ok(Self {
            orders,
            store_fitted: false,
            parallel: ParallelConfig::default(),
            state: None,
        })
    }

    /// Keep the training data of every order so that fitted values can be
    /// restored with `inverse_transform_fitted`.
    pub fn with_store_fitted(mut self, store_fitted: bool) -> Self {
        self.store_fitted = store_fitted;
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

    pub fn orders(&self) -> &[usize] {
        &self.orders
    }

    pub fn store_fitted(&self) -> bool {
        self.store_fitted
    }

    /// Number of series in the fitted state.
    pub fn n_groups(&self) -> Option<usize> {
        self.state.as_ref().map(|s| s.tails[0].n_groups())
    }

    /// Lag buffers of the fitted state, one array per order.
    pub fn lag_buffers(&self) -> Option<&[GroupedArray]> {
        self.state.as_ref().map(|s| s.tails.as_slice())
    }

    /// Retained training data of every order, when enabled.
    pub fn fitted_snapshots(&self) -> Option<&[GroupedArray]> {
        self.state.as_ref().and_then(|s| s.fitted.as_deref())
    }

    fn state(&self) -> Result<&DifferencesState> {
        self.state.as_ref().ok_or(TransformError::FitRequired)
    }
}

impl GroupedTransform for Differences {
    fn name(&self) -> &str {
        "Differences"
    }

    fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    fn fit_transform(&mut self, ga: &GroupedArray) -> Result<GroupedArray> {
        let total: usize = self.orders.iter().sum();
        let positions: Vec<usize> = ga
            .sizes()
            .iter()
            .enumerate()
            .filter(|(_, &size)| size < total)
            .map(|(i, _)| i)
            .collect();
        if !positions.is_empty() {
            return Err(TransformError::ShortSeries { positions });
        }

        let mut current = ga.clone();
        let mut tails = Vec::with_capacity(self.orders.len());
        let mut fitted = self.store_fitted.then(|| Vec::with_capacity(self.orders.len()));
        for &d in &self.orders {
            if let Some(snapshots) = fitted.as_mut() {
                snapshots.push(current.clone());
            }
            tails.push(current.tails(d));
            current = self.parallel.map_values(&current, |_, g| difference(g, d))?;
        }

        debug!(
            n_series = ga.n_groups(),
            orders = ?self.orders,
            store_fitted = self.store_fitted,
            "fitted differences"
        );
        self.state = Some(DifferencesState { tails, fitted });
        Ok(current)
    }

    fn update(&self, ga: &GroupedArray) -> Result<GroupedArray> {
        let state = self.state()?;
        check_n_groups(state.tails[0].n_groups(), ga)?;
        let mut current = ga.clone();
        for tail in &state.tails {
            current = self
                .parallel
                .map_values(&current, |i, g| difference_after(tail.group(i), g))?;
        }
        Ok(current)
    }

    fn inverse_transform(&self, ga: &GroupedArray) -> Result<GroupedArray> {
        let state = self.state()?;
        check_n_groups(state.tails[0].n_groups(), ga)?;
        let mut current = ga.clone();
        for tail in state.tails.iter().rev() {
            current = self
                .parallel
                .map_values(&current, |i, g| integrate_after(tail.group(i), g))?;
        }
        Ok(current)
    }

    fn inverse_transform_fitted(&self, ga: &GroupedArray) -> Result<GroupedArray> {
        let state = self.state()?;
        let snapshots = state.fitted.as_ref().ok_or_else(|| {
            TransformError::NotSupported(
                "fitted values were not retained, enable store_fitted before fitting".to_string(),
            )
        })?;
        let layout = &snapshots[0];
        check_n_groups(layout.n_groups(), ga)?;

        let sizes = ga.sizes();
        for (i, (&size, available)) in sizes.iter().zip(layout.sizes()).enumerate() {
            if size > available {
                return Err(TransformError::Value(format!(
                    "series {i} has {size} values but only {available} were retained at fit time"
                )));
            }
        }

        let mut restored = ga.data().to_vec();
        for (&d, snapshot) in self.orders.iter().zip(snapshots).rev() {
            let adds = snapshot.lag(d).tails_matching(&sizes)?;
            for (y, add) in restored.iter_mut().zip(adds.data()) {
                *y += add;
            }
        }
        ga.with_data(restored)
    }

    fn take(&self, idxs: &[usize]) -> Result<Self> {
        let state = self.state()?;
        let tails = state
            .tails
            .iter()
            .map(|t| t.take(idxs))
            .collect::<Result<Vec<_>>>()?;
        let fitted = state
            .fitted
            .as_ref()
            .map(|snapshots| snapshots.iter().map(|s| s.take(idxs)).collect::<Result<Vec<_>>>())
            .transpose()?;
        Ok(Self {
            orders: self.orders.clone(),
            store_fitted: self.store_fitted,
            parallel: self.parallel.clone(),
            state: Some(DifferencesState { tails, fitted }),
        })
    }

    fn stack_refs(parts: &[&Self]) -> Result<Self> {
        let first = first_part(parts)?;
        if parts.iter().any(|p| p.orders != first.orders) {
            return Err(TransformError::InvalidParameter(
                "cannot stack differences with different orders".to_string(),
            ));
        }
        let states = parts
            .iter()
            .map(|p| p.state())
            .collect::<Result<Vec<_>>>()?;

        let tails = (0..first.orders.len())
            .map(|j| GroupedArray::concat(states.iter().map(|s| &s.tails[j])))
            .collect();

        let n_retained = states.iter().filter(|s| s.fitted.is_some()).count();
        let fitted = if n_retained == states.len() {
            Some(
                (0..first.orders.len())
                    .map(|j| {
                        GroupedArray::concat(
                            states
                                .iter()
                                .filter_map(|s| s.fitted.as_ref())
                                .map(|f| &f[j]),
                        )
                    })
                    .collect(),
            )
        } else if n_retained == 0 {
            None
        } else {
            return Err(TransformError::InvalidParameter(
                "cannot stack differences with and without retained fitted values".to_string(),
            ));
        };

        debug!(n_parts = parts.len(), "stacked differences");
        Ok(Self {
            orders: first.orders.clone(),
            store_fitted: fitted.is_some(),
            parallel: first.parallel.clone(),
            state: Some(DifferencesState { tails, fitted }),
        })
    }
}
