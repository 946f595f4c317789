//! Common interface shared by every target transform.

use crate::core::GroupedArray;
use crate::error::{Result, TransformError};

/// Stateful, invertible transform over a grouped array of series.
///
/// `fit_transform` creates the fitted state. Every other operation only reads
/// it and must be given the same number of series, in the same order, as the
/// fit call. `take` and `stack` build new instances with their own copies of
/// the state, so shards can be fitted by independent workers and merged
/// afterwards.
pub trait GroupedTransform: Sized {
    /// Transform name.
    fn name(&self) -> &str;

    /// Whether `fit_transform` has been called.
    fn is_fitted(&self) -> bool;

    /// Fit the transform on `ga` and return the transformed values.
    fn fit_transform(&mut self, ga: &GroupedArray) -> Result<GroupedArray>;

    /// Apply the fitted transform to new observations that follow the fit data.
    fn update(&self, ga: &GroupedArray) -> Result<GroupedArray>;

    /// Map values from transformed space back to the original scale.
    fn inverse_transform(&self, ga: &GroupedArray) -> Result<GroupedArray>;

    /// Map in-sample (fitted) values back to the original scale.
    fn inverse_transform_fitted(&self, ga: &GroupedArray) -> Result<GroupedArray> {
        self.inverse_transform(ga)
    }

    /// New transform holding only the state of the series at `idxs`.
    fn take(&self, idxs: &[usize]) -> Result<Self>;

    /// Merge transforms fitted on disjoint shards, in the given order.
    fn stack_refs(parts: &[&Self]) -> Result<Self>;

    /// Merge transforms fitted on disjoint shards, in the given order.
    fn stack(parts: &[Self]) -> Result<Self> {
        let refs: Vec<&Self> = parts.iter().collect();
        Self::stack_refs(&refs)
    }
}

/// First element of a list of shards to stack.
pub(crate) fn first_part<'a, T>(parts: &'a [&'a T]) -> Result<&'a T> {
    parts.first().copied().ok_or_else(|| {
        TransformError::InvalidParameter("cannot stack an empty list of transforms".to_string())
    })
}

/// Fail unless `ga` has exactly `expected` series.
pub(crate) fn check_n_groups(expected: usize, ga: &GroupedArray) -> Result<()> {
    if ga.n_groups() != expected {
        return Err(TransformError::ShapeMismatch {
            expected,
            got: ga.n_groups(),
        });
    }
    Ok(())
}

/// Gather per-series entries at `idxs`.
pub(crate) fn take_positions<T: Clone>(values: &[T], idxs: &[usize]) -> Result<Vec<T>> {
    idxs.iter()
        .map(|&i| {
            values.get(i).cloned().ok_or(TransformError::IndexOutOfBounds {
                index: i,
                size: values.len(),
            })
        })
        .collect()
}
