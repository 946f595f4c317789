//! Error types for the target-transforms library.

use thiserror::Error;

/// Result type alias for transform operations.
pub type Result<T> = std::result::Result<T, TransformError>;

/// Errors that can occur while fitting or applying target transforms.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    /// The offset index of a grouped array is malformed.
    #[error("invalid layout: {0}")]
    InvalidLayout(String),

    /// Some series are shorter than the total difference order.
    #[error("series at positions {positions:?} are too short for the configured differences")]
    ShortSeries { positions: Vec<usize> },

    /// Number of series differs from the fitted state.
    #[error("shape mismatch: expected {expected} series, got {got}")]
    ShapeMismatch { expected: usize, got: usize },

    /// The operation is not defined for this transform.
    #[error("not supported: {0}")]
    NotSupported(String),

    /// Input values are incompatible with the fitted state.
    #[error("value error: {0}")]
    Value(String),

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Transform has not been fitted yet.
    #[error("transform must be fitted before use")]
    FitRequired,

    /// Series index out of bounds.
    #[error("index out of bounds: {index} (size: {size})")]
    IndexOutOfBounds { index: usize, size: usize },

    /// Worker pool could not be created.
    #[error("thread pool error: {0}")]
    ThreadPool(String),
}
