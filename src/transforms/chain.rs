//! Ordered sequence of target transforms applied as one.

use super::traits::{first_part, GroupedTransform};
use super::variant::TargetTransform;
use crate::core::GroupedArray;
use crate::error::{Result, TransformError};
use tracing::debug;

/// Applies its transforms in order on the way in and in reverse order on the
/// way back.
///
/// # Example
///
/// ```
/// use target_transforms::core::GroupedArray;
/// use target_transforms::transforms::{
///     Differences, GroupedTransform, LocalStandardScaler, TransformChain,
/// };
///
/// let mut chain = TransformChain::new()
///     .with(Differences::new([1]).unwrap())
///     .with(LocalStandardScaler::default());
/// let ga = GroupedArray::from_groups(&[vec![1.0, 2.0, 4.0, 7.0, 11.0]]);
/// let out = chain.fit_transform(&ga).unwrap();
/// assert!(out.data()[0].is_nan());
///
/// let forecast = GroupedArray::from_groups(&[vec![0.0]]);
/// let restored = chain.inverse_transform(&forecast).unwrap();
/// assert!((restored.data()[0] - 13.5).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TransformChain {
    transforms: Vec<TargetTransform>,
}

impl TransformChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a transform to the end of the chain.
    pub fn with<T: Into<TargetTransform>>(mut self, transform: T) -> Self {
        self.transforms.push(transform.into());
        self
    }

    pub fn push<T: Into<TargetTransform>>(&mut self, transform: T) {
        self.transforms.push(transform.into());
    }

    pub fn transforms(&self) -> &[TargetTransform] {
        &self.transforms
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

impl From<Vec<TargetTransform>> for TransformChain {
    fn from(transforms: Vec<TargetTransform>) -> Self {
        Self { transforms }
    }
}

impl GroupedTransform for TransformChain {
    fn name(&self) -> &str {
        "TransformChain"
    }

    fn is_fitted(&self) -> bool {
        self.transforms.iter().all(|t| t.is_fitted())
    }

    fn fit_transform(&mut self, ga: &GroupedArray) -> Result<GroupedArray> {
        let mut current = ga.clone();
        for t in &mut self.transforms {
            current = t.fit_transform(&current)?;
        }
        debug!(n_transforms = self.transforms.len(), "fitted transform chain");
        Ok(current)
    }

    fn update(&self, ga: &GroupedArray) -> Result<GroupedArray> {
        self.transforms
            .iter()
            .try_fold(ga.clone(), |current, t| t.update(&current))
    }

    fn inverse_transform(&self, ga: &GroupedArray) -> Result<GroupedArray> {
        self.transforms
            .iter()
            .rev()
            .try_fold(ga.clone(), |current, t| t.inverse_transform(&current))
    }

    fn inverse_transform_fitted(&self, ga: &GroupedArray) -> Result<GroupedArray> {
        self.transforms
            .iter()
            .rev()
            .try_fold(ga.clone(), |current, t| t.inverse_transform_fitted(&current))
    }

    fn take(&self, idxs: &[usize]) -> Result<Self> {
        let transforms = self
            .transforms
            .iter()
            .map(|t| t.take(idxs))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { transforms })
    }

    fn stack_refs(parts: &[&Self]) -> Result<Self> {
        let first = first_part(parts)?;
        if parts.iter().any(|p| p.len() != first.len()) {
            return Err(TransformError::InvalidParameter(
                "cannot stack chains of different lengths".to_string(),
            ));
        }
        let transforms = (0..first.len())
            .map(|j| {
                let column: Vec<&TargetTransform> =
                    parts.iter().map(|p| &p.transforms[j]).collect();
                TargetTransform::stack_refs(&column)
            })
            .collect::<Result<Vec<_>>>()?;
        debug!(n_parts = parts.len(), "stacked transform chains");
        Ok(Self { transforms })
    }
}
