//! # target-transforms
//!
//! Invertible target transforms for forecasting many time series at once.
//!
//! Series are packed into a [`GroupedArray`](core::GroupedArray): one flat
//! buffer of values plus an offset index. Transforms are fitted on all series
//! in one call, applied to new observations with `update`, and map forecasts
//! back to the original scale with `inverse_transform`. Fitted transforms can
//! be split with `take` and merged with `stack`, so shards of a panel can be
//! processed by independent workers.
//!
//! Provided transforms:
//! - [`Differences`](transforms::Differences): fixed difference orders
//! - [`AutoDifferences`](transforms::AutoDifferences): per-series orders
//!   chosen by stationarity and seasonality tests
//! - local standard, min-max, robust and Box-Cox scalers
//! - [`GlobalTransformer`](transforms::GlobalTransformer): one column
//!   transformer fitted on all values

#![allow(clippy::needless_range_loop)]

pub mod core;
pub mod error;
pub mod stats;
pub mod transforms;

pub use error::{Result, TransformError};

pub mod prelude {
    pub use crate::core::{GroupedArray, ParallelConfig};
    pub use crate::error::{Result, TransformError};
    pub use crate::transforms::{
        AutoDifferences, Differences, GlobalTransformer, GroupedTransform, LocalBoxCox,
        LocalMinMaxScaler, LocalRobustScaler, LocalStandardScaler, TargetTransform,
        TransformChain,
    };
}
