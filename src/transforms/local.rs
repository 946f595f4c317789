//! Per-series scalers.
//!
//! Every series gets its own parameters, fitted on its non-NaN values.
//! The fitting statistic and the forward/inverse maps come from a
//! [`ScalerKernel`]; storage, update, `take` and `stack` are shared by all
//! kernels through [`LocalScaler`].

use super::traits::{check_n_groups, first_part, take_positions, GroupedTransform};
use crate::core::{GroupedArray, ParallelConfig};
use crate::error::{Result, TransformError};
use crate::stats::{boxcox, boxcox_lambda, inv_boxcox, iqr, mad, mean, median, min_max, std_dev};
use std::fmt::Debug;
use tracing::debug;

/// Scales below this are replaced by one.
const MIN_SCALE: f64 = 1e-10;

/// Statistic and element-wise maps of one scaler family.
pub trait ScalerKernel: Clone + Debug + PartialEq + Send + Sync {
    /// Fitted parameters of one series.
    type Params: Copy + Debug + PartialEq + Send + Sync;

    fn name(&self) -> &'static str;

    /// Fit parameters on one series. NaN values are ignored.
    fn fit(&self, values: &[f64]) -> Self::Params;

    fn forward(&self, params: &Self::Params, x: f64) -> f64;

    fn inverse(&self, params: &Self::Params, y: f64) -> f64;
}

/// Location and scale of an affine scaler: `y = (x - location) / scale`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineParams {
    pub location: f64,
    pub scale: f64,
}

impl AffineParams {
    /// Build parameters, replacing a degenerate scale by one and a missing
    /// location by zero.
    pub fn new(location: f64, scale: f64) -> Self {
        let location = if location.is_finite() { location } else { 0.0 };
        let scale = if !scale.is_finite() || scale.abs() < MIN_SCALE {
            1.0
        } else {
            scale
        };
        Self { location, scale }
    }

    pub fn forward(&self, x: f64) -> f64 {
        (x - self.location) / self.scale
    }

    pub fn inverse(&self, y: f64) -> f64 {
        y * self.scale + self.location
    }
}

/// Subtract the mean and divide by the sample standard deviation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StandardKernel;

impl ScalerKernel for StandardKernel {
    type Params = AffineParams;

    fn name(&self) -> &'static str {
        "LocalStandardScaler"
    }

    fn fit(&self, values: &[f64]) -> AffineParams {
        AffineParams::new(mean(values), std_dev(values))
    }

    fn forward(&self, params: &AffineParams, x: f64) -> f64 {
        params.forward(x)
    }

    fn inverse(&self, params: &AffineParams, y: f64) -> f64 {
        params.inverse(y)
    }
}

/// Map the observed range of each series to `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MinMaxKernel;

impl ScalerKernel for MinMaxKernel {
    type Params = AffineParams;

    fn name(&self) -> &'static str {
        "LocalMinMaxScaler"
    }

    fn fit(&self, values: &[f64]) -> AffineParams {
        let (min, max) = min_max(values);
        AffineParams::new(min, max - min)
    }

    fn forward(&self, params: &AffineParams, x: f64) -> f64 {
        params.forward(x)
    }

    fn inverse(&self, params: &AffineParams, y: f64) -> f64 {
        params.inverse(y)
    }
}

/// Spread statistic of a robust scaler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RobustStatistic {
    /// Interquartile range.
    #[default]
    Iqr,
    /// Median absolute deviation.
    Mad,
}

/// Subtract the median and divide by the IQR or MAD.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RobustKernel {
    statistic: RobustStatistic,
}

impl RobustKernel {
    pub fn new(statistic: RobustStatistic) -> Self {
        Self { statistic }
    }

    pub fn with_statistic(mut self, statistic: RobustStatistic) -> Self {
        self.statistic = statistic;
        self
    }

    pub fn statistic(&self) -> RobustStatistic {
        self.statistic
    }
}

impl ScalerKernel for RobustKernel {
    type Params = AffineParams;

    fn name(&self) -> &'static str {
        "LocalRobustScaler"
    }

    fn fit(&self, values: &[f64]) -> AffineParams {
        let spread = match self.statistic {
            RobustStatistic::Iqr => iqr(values),
            RobustStatistic::Mad => mad(values),
        };
        AffineParams::new(median(values), spread)
    }

    fn forward(&self, params: &AffineParams, x: f64) -> f64 {
        params.forward(x)
    }

    fn inverse(&self, params: &AffineParams, y: f64) -> f64 {
        params.inverse(y)
    }
}

/// Fitted Box-Cox exponent of one series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxCoxParams {
    pub lambda: f64,
}

/// Box-Cox power transform with a per-series lambda.
///
/// Lambda maximizes the log-likelihood within `[lower, upper]`.
/// Non-positive inputs map to NaN.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxCoxKernel {
    lower: f64,
    upper: f64,
}

impl Default for BoxCoxKernel {
    fn default() -> Self {
        Self {
            lower: 0.0,
            upper: 2.0,
        }
    }
}

impl BoxCoxKernel {
    /// Kernel searching lambda in `[lower, upper]`.
    pub fn new(lower: f64, upper: f64) -> Result<Self> {
        if !lower.is_finite() || !upper.is_finite() || lower >= upper {
            return Err(TransformError::InvalidParameter(format!(
                "Box-Cox bounds must be finite with lower < upper, got [{lower}, {upper}]"
            )));
        }
        Ok(Self { lower, upper })
    }

    pub fn bounds(&self) -> (f64, f64) {
        (self.lower, self.upper)
    }
}

impl ScalerKernel for BoxCoxKernel {
    type Params = BoxCoxParams;

    fn name(&self) -> &'static str {
        "LocalBoxCox"
    }

    fn fit(&self, values: &[f64]) -> BoxCoxParams {
        BoxCoxParams {
            lambda: boxcox_lambda(values, self.lower, self.upper),
        }
    }

    fn forward(&self, params: &BoxCoxParams, x: f64) -> f64 {
        boxcox(x, params.lambda)
    }

    fn inverse(&self, params: &BoxCoxParams, y: f64) -> f64 {
        inv_boxcox(y, params.lambda)
    }
}

/// Scaler fitting one parameter record per series.
///
/// # Example
///
/// ```
/// use target_transforms::core::GroupedArray;
/// use target_transforms::transforms::{GroupedTransform, LocalMinMaxScaler};
///
/// let ga = GroupedArray::from_groups(&[vec![2.0, 4.0, 6.0], vec![10.0, 20.0]]);
/// let mut scaler = LocalMinMaxScaler::default();
/// let out = scaler.fit_transform(&ga).unwrap();
/// assert_eq!(out.data(), &[0.0, 0.5, 1.0, 0.0, 1.0]);
/// ```
#[derive(Debug, Clone)]
pub struct LocalScaler<K: ScalerKernel> {
    kernel: K,
    parallel: ParallelConfig,
    params: Option<Vec<K::Params>>,
}

pub type LocalStandardScaler = LocalScaler<StandardKernel>;
pub type LocalMinMaxScaler = LocalScaler<MinMaxKernel>;
pub type LocalRobustScaler = LocalScaler<RobustKernel>;
pub type LocalBoxCox = LocalScaler<BoxCoxKernel>;

impl<K: ScalerKernel + Default> Default for LocalScaler<K> {
    fn default() -> Self {
        Self::new(K::default())
    }
}

impl<K: ScalerKernel> LocalScaler<K> {
    pub fn new(kernel: K) -> Self {
        Self {
            kernel,
            parallel: ParallelConfig::default(),
            params: None,
        }
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

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Fitted parameters, one per series.
    pub fn params(&self) -> Option<&[K::Params]> {
        self.params.as_deref()
    }

    fn fitted_params(&self, ga: &GroupedArray) -> Result<&[K::Params]> {
        let params = self.params.as_deref().ok_or(TransformError::FitRequired)?;
        check_n_groups(params.len(), ga)?;
        Ok(params)
    }

    fn apply<F>(&self, ga: &GroupedArray, params: &[K::Params], f: F) -> Result<GroupedArray>
    where
        F: Fn(&K, &K::Params, f64) -> f64 + Sync + Send,
    {
        let kernel = &self.kernel;
        self.parallel.map_values(ga, |i, g| {
            let p = &params[i];
            g.iter().map(|&x| f(kernel, p, x)).collect()
        })
    }

    fn with_params(&self, params: Vec<K::Params>) -> Self {
        Self {
            kernel: self.kernel.clone(),
            parallel: self.parallel.clone(),
            params: Some(params),
        }
    }
}

impl<K: ScalerKernel> GroupedTransform for LocalScaler<K> {
    fn name(&self) -> &str {
        self.kernel.name()
    }

    fn is_fitted(&self) -> bool {
        self.params.is_some()
    }

    fn fit_transform(&mut self, ga: &GroupedArray) -> Result<GroupedArray> {
        let kernel = &self.kernel;
        let params = self.parallel.map_groups(ga, |_, g| kernel.fit(g))?;
        let out = self.apply(ga, &params, K::forward)?;
        debug!(
            scaler = self.kernel.name(),
            n_series = ga.n_groups(),
            "fitted local scaler"
        );
        self.params = Some(params);
        Ok(out)
    }

    fn update(&self, ga: &GroupedArray) -> Result<GroupedArray> {
        let params = self.fitted_params(ga)?;
        self.apply(ga, params, K::forward)
    }

    fn inverse_transform(&self, ga: &GroupedArray) -> Result<GroupedArray> {
        let params = self.fitted_params(ga)?;
        self.apply(ga, params, K::inverse)
    }

    fn take(&self, idxs: &[usize]) -> Result<Self> {
        let params = self.params.as_deref().ok_or(TransformError::FitRequired)?;
        Ok(self.with_params(take_positions(params, idxs)?))
    }

    fn stack_refs(parts: &[&Self]) -> Result<Self> {
        let first = first_part(parts)?;
        if parts.iter().any(|p| p.kernel != first.kernel) {
            return Err(TransformError::InvalidParameter(format!(
                "cannot stack {} instances with different settings",
                first.kernel.name()
            )));
        }
        let mut params = Vec::new();
        for part in parts {
            let p = part.params.as_deref().ok_or(TransformError::FitRequired)?;
            params.extend_from_slice(p);
        }
        debug!(
            scaler = first.kernel.name(),
            n_parts = parts.len(),
            n_series = params.len(),
            "stacked local scalers"
        );
        Ok(first.with_params(params))
    }
}
