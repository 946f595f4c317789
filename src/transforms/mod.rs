//! Target transforms for grouped series.
//!
//! Every transform implements [`GroupedTransform`]. The families are
//! [`Differences`] (fixed lags), [`AutoDifferences`] (lags chosen per series),
//! the per-series [`LocalScaler`]s and the [`GlobalTransformer`]. They can be
//! held uniformly as [`TargetTransform`] and composed with [`TransformChain`].

mod auto_diff;
mod chain;
mod differences;
mod global;
mod local;
mod traits;
mod variant;

pub use auto_diff::{AutoDifferences, DiffLevel, OrderSearch};
pub use chain::TransformChain;
pub use differences::Differences;
pub use global::{
    ColumnTransformer, FunctionTransformer, GlobalTransformer, MinMaxColumnScaler,
    StandardColumnScaler,
};
pub use local::{
    AffineParams, BoxCoxKernel, BoxCoxParams, LocalBoxCox, LocalMinMaxScaler, LocalRobustScaler,
    LocalScaler, LocalStandardScaler, MinMaxKernel, RobustKernel, RobustStatistic, ScalerKernel,
    StandardKernel,
};
pub use traits::GroupedTransform;
pub use variant::TargetTransform;
