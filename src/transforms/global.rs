//! Transforms fitted once on all series together.

use super::local::AffineParams;
use super::traits::{first_part, GroupedTransform};
use crate::core::GroupedArray;
use crate::error::{Result, TransformError};
use crate::stats::{mean, min_max, std_dev};
use std::fmt::Debug;
use tracing::{debug, warn};

/// Invertible transform over a single flat column of values.
pub trait ColumnTransformer: Debug + Send + Sync {
    fn name(&self) -> &str;

    /// Fit on the whole column.
    fn fit(&mut self, column: &[f64]) -> Result<()>;

    fn transform(&self, column: &[f64]) -> Result<Vec<f64>>;

    fn inverse_transform(&self, column: &[f64]) -> Result<Vec<f64>>;

    /// Clone into a new box.
    fn clone_box(&self) -> Box<dyn ColumnTransformer>;
}

impl Clone for Box<dyn ColumnTransformer> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Affine scaling of a column with parameters from `fit`.
fn affine_map(
    params: Option<&AffineParams>,
    column: &[f64],
    f: fn(&AffineParams, f64) -> f64,
) -> Result<Vec<f64>> {
    let params = params.ok_or(TransformError::FitRequired)?;
    Ok(column.iter().map(|&x| f(params, x)).collect())
}

/// Standardize the column by its mean and sample standard deviation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StandardColumnScaler {
    params: Option<AffineParams>,
}

impl StandardColumnScaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn params(&self) -> Option<AffineParams> {
        self.params
    }
}

impl ColumnTransformer for StandardColumnScaler {
    fn name(&self) -> &str {
        "StandardScaler"
    }

    fn fit(&mut self, column: &[f64]) -> Result<()> {
        self.params = Some(AffineParams::new(mean(column), std_dev(column)));
        Ok(())
    }

    fn transform(&self, column: &[f64]) -> Result<Vec<f64>> {
        affine_map(self.params.as_ref(), column, AffineParams::forward)
    }

    fn inverse_transform(&self, column: &[f64]) -> Result<Vec<f64>> {
        affine_map(self.params.as_ref(), column, AffineParams::inverse)
    }

    fn clone_box(&self) -> Box<dyn ColumnTransformer> {
        Box::new(self.clone())
    }
}

/// Map the observed range of the column to `[0, 1]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MinMaxColumnScaler {
    params: Option<AffineParams>,
}

impl MinMaxColumnScaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn params(&self) -> Option<AffineParams> {
        self.params
    }
}

impl ColumnTransformer for MinMaxColumnScaler {
    fn name(&self) -> &str {
        "MinMaxScaler"
    }

    fn fit(&mut self, column: &[f64]) -> Result<()> {
        let (min, max) = min_max(column);
        self.params = Some(AffineParams::new(min, max - min));
        Ok(())
    }

    fn transform(&self, column: &[f64]) -> Result<Vec<f64>> {
        affine_map(self.params.as_ref(), column, AffineParams::forward)
    }

    fn inverse_transform(&self, column: &[f64]) -> Result<Vec<f64>> {
        affine_map(self.params.as_ref(), column, AffineParams::inverse)
    }

    fn clone_box(&self) -> Box<dyn ColumnTransformer> {
        Box::new(self.clone())
    }
}

/// Stateless pair of element-wise functions.
#[derive(Debug, Clone, Copy)]
pub struct FunctionTransformer {
    name: &'static str,
    forward: fn(f64) -> f64,
    inverse: fn(f64) -> f64,
}

impl FunctionTransformer {
    /// `inverse` must undo `forward` on its domain.
    pub fn new(name: &'static str, forward: fn(f64) -> f64, inverse: fn(f64) -> f64) -> Self {
        Self {
            name,
            forward,
            inverse,
        }
    }

    /// `ln(1 + x)` with `exp(y) - 1` as inverse.
    pub fn log1p() -> Self {
        Self::new("log1p", f64::ln_1p, f64::exp_m1)
    }
}

impl ColumnTransformer for FunctionTransformer {
    fn name(&self) -> &str {
        self.name
    }

    fn fit(&mut self, _column: &[f64]) -> Result<()> {
        Ok(())
    }

    fn transform(&self, column: &[f64]) -> Result<Vec<f64>> {
        Ok(column.iter().map(|&x| (self.forward)(x)).collect())
    }

    fn inverse_transform(&self, column: &[f64]) -> Result<Vec<f64>> {
        Ok(column.iter().map(|&y| (self.inverse)(y)).collect())
    }

    fn clone_box(&self) -> Box<dyn ColumnTransformer> {
        Box::new(*self)
    }
}

/// Applies one column transformer to the values of all series at once.
///
/// The fit ignores series boundaries, so the state is not partitioned by
/// series: `take` returns a copy of the whole fit and `stack` keeps the fit
/// of the first part.
///
/// # Example
///
/// ```
/// use target_transforms::core::GroupedArray;
/// use target_transforms::transforms::{GlobalTransformer, GroupedTransform, StandardColumnScaler};
///
/// let ga = GroupedArray::from_groups(&[vec![1.0, 2.0], vec![3.0, 4.0, 5.0]]);
/// let mut global = GlobalTransformer::new(StandardColumnScaler::new());
/// let out = global.fit_transform(&ga).unwrap();
/// assert_eq!(out.data()[2], 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct GlobalTransformer {
    prototype: Box<dyn ColumnTransformer>,
    fitted: Option<Box<dyn ColumnTransformer>>,
}

impl GlobalTransformer {
    pub fn new<T: ColumnTransformer + 'static>(prototype: T) -> Self {
        Self::from_boxed(Box::new(prototype))
    }

    pub fn from_boxed(prototype: Box<dyn ColumnTransformer>) -> Self {
        Self {
            prototype,
            fitted: None,
        }
    }

    /// The fitted column transformer.
    pub fn fitted(&self) -> Option<&dyn ColumnTransformer> {
        self.fitted.as_deref()
    }

    fn fitted_transformer(&self) -> Result<&dyn ColumnTransformer> {
        self.fitted.as_deref().ok_or(TransformError::FitRequired)
    }

    /// Inverse transform several columns (e.g. a point forecast and its
    /// quantiles), each independently.
    pub fn inverse_transform_columns(&self, columns: &[&[f64]]) -> Result<Vec<Vec<f64>>> {
        let fitted = self.fitted_transformer()?;
        columns
            .iter()
            .map(|column| fitted.inverse_transform(column))
            .collect()
    }
}

impl GroupedTransform for GlobalTransformer {
    fn name(&self) -> &str {
        self.prototype.name()
    }

    fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    fn fit_transform(&mut self, ga: &GroupedArray) -> Result<GroupedArray> {
        let mut transformer = self.prototype.clone();
        transformer.fit(ga.data())?;
        let out = ga.with_data(transformer.transform(ga.data())?)?;
        debug!(
            transformer = transformer.name(),
            n_series = ga.n_groups(),
            n_values = ga.len(),
            "fitted global transformer"
        );
        self.fitted = Some(transformer);
        Ok(out)
    }

    fn update(&self, ga: &GroupedArray) -> Result<GroupedArray> {
        let fitted = self.fitted_transformer()?;
        ga.with_data(fitted.transform(ga.data())?)
    }

    fn inverse_transform(&self, ga: &GroupedArray) -> Result<GroupedArray> {
        let fitted = self.fitted_transformer()?;
        ga.with_data(fitted.inverse_transform(ga.data())?)
    }

    fn take(&self, _idxs: &[usize]) -> Result<Self> {
        self.fitted_transformer()?;
        Ok(self.clone())
    }

    fn stack_refs(parts: &[&Self]) -> Result<Self> {
        let first = first_part(parts)?;
        first.fitted_transformer()?;
        if parts.len() > 1 {
            warn!(
                transformer = first.name(),
                n_parts = parts.len(),
                "global transformers cannot be merged, keeping the fit of the first part"
            );
        }
        Ok(first.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn panel() -> GroupedArray {
        GroupedArray::from_groups(&[vec![1.0, 2.0, 3.0], vec![10.0, 20.0]])
    }

    #[test]
    fn fit_ignores_series_boundaries() {
        let mut global = GlobalTransformer::new(MinMaxColumnScaler::new());
        let out = global.fit_transform(&panel()).unwrap();
        assert_eq!(out.indptr(), panel().indptr());
        assert_eq!(out.data()[0], 0.0);
        assert_eq!(out.data()[4], 1.0);
    }

    #[test]
    fn standard_roundtrip() {
        let ga = panel();
        let mut global = GlobalTransformer::new(StandardColumnScaler::new());
        let out = global.fit_transform(&ga).unwrap();
        assert_relative_eq!(mean(out.data()), 0.0, epsilon = 1e-12);

        let restored = global.inverse_transform(&out).unwrap();
        for (a, b) in restored.data().iter().zip(ga.data()) {
            assert_relative_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn update_uses_fitted_parameters() {
        let mut global = GlobalTransformer::new(MinMaxColumnScaler::new());
        global.fit_transform(&panel()).unwrap();
        let new = GroupedArray::from_groups(&[vec![39.0]]);
        assert_eq!(global.update(&new).unwrap().data(), &[2.0]);
    }

    #[test]
    fn log1p_roundtrip() {
        let ga = panel();
        let mut global = GlobalTransformer::new(FunctionTransformer::log1p());
        let out = global.fit_transform(&ga).unwrap();
        assert_relative_eq!(out.data()[0], 2.0_f64.ln());
        assert_eq!(global.name(), "log1p");

        let restored = global.inverse_transform(&out).unwrap();
        for (a, b) in restored.data().iter().zip(ga.data()) {
            assert_relative_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn inverse_columns_independently() {
        let mut global = GlobalTransformer::new(MinMaxColumnScaler::new());
        global.fit_transform(&panel()).unwrap();
        let point = vec![0.0, 1.0];
        let lower = vec![0.5];
        let out = global
            .inverse_transform_columns(&[point.as_slice(), lower.as_slice()])
            .unwrap();
        assert_eq!(out, vec![vec![1.0, 20.0], vec![10.5]]);
    }

    #[test]
    fn take_and_stack_copy_the_fit() {
        let mut global = GlobalTransformer::new(StandardColumnScaler::new());
        global.fit_transform(&panel()).unwrap();

        let part = global.take(&[1]).unwrap();
        let stacked = GlobalTransformer::stack(&[part.clone(), part]).unwrap();
        let new = GroupedArray::from_groups(&[vec![4.0], vec![5.0]]);
        assert_eq!(stacked.update(&new), global.update(&new));
    }

    #[test]
    fn requires_fit() {
        let global = GlobalTransformer::new(StandardColumnScaler::new());
        assert!(!global.is_fitted());
        assert!(matches!(global.take(&[0]), Err(TransformError::FitRequired)));
        assert_eq!(
            global.inverse_transform(&panel()),
            Err(TransformError::FitRequired)
        );
        assert!(matches!(
            GlobalTransformer::stack(&[global]),
            Err(TransformError::FitRequired)
        ));
    }

    #[test]
    fn unfitted_column_scaler_fails() {
        let scaler = StandardColumnScaler::new();
        assert_eq!(scaler.transform(&[1.0]), Err(TransformError::FitRequired));
    }
}
