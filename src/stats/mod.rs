//! Single-series numeric kernels.
//!
//! The transforms call these per series; none of them know about grouped
//! layouts. Scaling statistics skip NaN values.

pub mod boxcox;
pub mod scale;
pub mod seasonality;
pub mod selector;
pub mod stationarity;

pub use boxcox::{boxcox, boxcox_lambda, inv_boxcox};
pub use scale::{iqr, mad, mean, median, min_max, quantile, std_dev};
pub use seasonality::{find_period, num_seasonal_diffs, seasonal_strength};
pub use selector::{OrderSelector, StationaritySelector};
pub use stationarity::{kpss_statistic, num_diffs, KpssConfig};
