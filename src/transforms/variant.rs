//! Closed set of target transforms behind one type.

use super::auto_diff::AutoDifferences;
use super::differences::Differences;
use super::global::GlobalTransformer;
use super::local::{LocalBoxCox, LocalMinMaxScaler, LocalRobustScaler, LocalStandardScaler};
use super::traits::{first_part, GroupedTransform};
use crate::core::GroupedArray;
use crate::error::{Result, TransformError};

/// Any target transform, dispatching the [`GroupedTransform`] operations to
/// the wrapped family.
#[derive(Debug, Clone)]
pub enum TargetTransform {
    Differences(Differences),
    AutoDifferences(AutoDifferences),
    StandardScaler(LocalStandardScaler),
    MinMaxScaler(LocalMinMaxScaler),
    RobustScaler(LocalRobustScaler),
    BoxCox(LocalBoxCox),
    Global(GlobalTransformer),
}

macro_rules! dispatch {
    ($self:expr, $t:ident => $body:expr) => {
        match $self {
            TargetTransform::Differences($t) => $body,
            TargetTransform::AutoDifferences($t) => $body,
            TargetTransform::StandardScaler($t) => $body,
            TargetTransform::MinMaxScaler($t) => $body,
            TargetTransform::RobustScaler($t) => $body,
            TargetTransform::BoxCox($t) => $body,
            TargetTransform::Global($t) => $body,
        }
    };
}

macro_rules! impl_from {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for TargetTransform {
                fn from(t: $ty) -> Self {
                    TargetTransform::$variant(t)
                }
            }
        )*
    };
}

impl_from!(
    Differences(Differences),
    AutoDifferences(AutoDifferences),
    StandardScaler(LocalStandardScaler),
    MinMaxScaler(LocalMinMaxScaler),
    RobustScaler(LocalRobustScaler),
    BoxCox(LocalBoxCox),
    Global(GlobalTransformer),
);

/// Stack parts that must all be of the variant selected by `pick`.
fn same_variant<T, F>(parts: &[&TargetTransform], pick: F) -> Result<T>
where
    T: GroupedTransform,
    F: Fn(&TargetTransform) -> Option<&T>,
{
    let inner = parts
        .iter()
        .map(|&p| pick(p))
        .collect::<Option<Vec<&T>>>()
        .ok_or_else(|| {
            TransformError::InvalidParameter(
                "cannot stack transforms of different kinds".to_string(),
            )
        })?;
    T::stack_refs(&inner)
}

impl GroupedTransform for TargetTransform {
    fn name(&self) -> &str {
        dispatch!(self, t => t.name())
    }

    fn is_fitted(&self) -> bool {
        dispatch!(self, t => t.is_fitted())
    }

    fn fit_transform(&mut self, ga: &GroupedArray) -> Result<GroupedArray> {
        dispatch!(self, t => t.fit_transform(ga))
    }

    fn update(&self, ga: &GroupedArray) -> Result<GroupedArray> {
        dispatch!(self, t => t.update(ga))
    }

    fn inverse_transform(&self, ga: &GroupedArray) -> Result<GroupedArray> {
        dispatch!(self, t => t.inverse_transform(ga))
    }

    fn inverse_transform_fitted(&self, ga: &GroupedArray) -> Result<GroupedArray> {
        dispatch!(self, t => t.inverse_transform_fitted(ga))
    }

    fn take(&self, idxs: &[usize]) -> Result<Self> {
        dispatch!(self, t => t.take(idxs).map(Self::from))
    }

    fn stack_refs(parts: &[&Self]) -> Result<Self> {
        use TargetTransform as T;
        let first = first_part(parts)?;
        match first {
            T::Differences(_) => same_variant(parts, |p| match p {
                T::Differences(t) => Some(t),
                _ => None,
            })
            .map(T::Differences),
            T::AutoDifferences(_) => same_variant(parts, |p| match p {
                T::AutoDifferences(t) => Some(t),
                _ => None,
            })
            .map(T::AutoDifferences),
            T::StandardScaler(_) => same_variant(parts, |p| match p {
                T::StandardScaler(t) => Some(t),
                _ => None,
            })
            .map(T::StandardScaler),
            T::MinMaxScaler(_) => same_variant(parts, |p| match p {
                T::MinMaxScaler(t) => Some(t),
                _ => None,
            })
            .map(T::MinMaxScaler),
            T::RobustScaler(_) => same_variant(parts, |p| match p {
                T::RobustScaler(t) => Some(t),
                _ => None,
            })
            .map(T::RobustScaler),
            T::BoxCox(_) => same_variant(parts, |p| match p {
                T::BoxCox(t) => Some(t),
                _ => None,
            })
            .map(T::BoxCox),
            T::Global(_) => same_variant(parts, |p| match p {
                T::Global(t) => Some(t),
                _ => None,
            })
            .map(T::Global),
        }
    }
}
