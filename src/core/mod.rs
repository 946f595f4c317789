//! Core data structures for grouped series.

mod grouped_array;
mod parallel;

pub use grouped_array::GroupedArray;
pub use parallel::ParallelConfig;
