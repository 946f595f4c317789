//! Fan-out of per-series work over a worker pool.

use crate::core::GroupedArray;
use crate::error::{Result, TransformError};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::{Arc, OnceLock};

/// Number of worker threads used for per-series work.
///
/// The value is fixed at construction of the transform that owns it, so two
/// transforms never share a mutable thread setting. The worker pool is built
/// on first use and shared by clones of the config, including the configs
/// of transforms created with `take` and `stack`.
#[derive(Debug, Clone)]
pub struct ParallelConfig {
    num_threads: usize,
    pool: Arc<OnceLock<ThreadPool>>,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self::new(1)
    }
}

impl PartialEq for ParallelConfig {
    fn eq(&self, other: &Self) -> bool {
        self.num_threads == other.num_threads
    }
}

impl Eq for ParallelConfig {}

impl ParallelConfig {
    /// Config running on `num_threads` workers (`0` and `1` both mean inline).
    pub fn new(num_threads: usize) -> Self {
        Self {
            num_threads,
            pool: Arc::default(),
        }
    }

    /// Set the number of worker threads.
    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self.pool = Arc::default();
        self
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Worker pool, built on the first call.
    fn pool(&self) -> Result<&ThreadPool> {
        if let Some(pool) = self.pool.get() {
            return Ok(pool);
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.num_threads)
            .build()
            .map_err(|e| TransformError::ThreadPool(e.to_string()))?;
        // A concurrent first call may have won; its pool is kept
        Ok(self.pool.get_or_init(|| pool))
    }

    /// Apply `f` to every series, keeping series order in the output.
    pub(crate) fn map_groups<T, F>(&self, ga: &GroupedArray, f: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(usize, &[f64]) -> T + Sync + Send,
    {
        if self.num_threads <= 1 || ga.n_groups() < 2 {
            return Ok(ga.groups().enumerate().map(|(i, g)| f(i, g)).collect());
        }
        let pool = self.pool()?;
        let groups: Vec<&[f64]> = ga.groups().collect();
        Ok(pool.install(|| {
            groups
                .par_iter()
                .enumerate()
                .map(|(i, g)| f(i, g))
                .collect()
        }))
    }

    /// Apply a length-preserving `f` to every series, producing a new array
    /// with the same layout.
    pub(crate) fn map_values<F>(&self, ga: &GroupedArray, f: F) -> Result<GroupedArray>
    where
        F: Fn(usize, &[f64]) -> Vec<f64> + Sync + Send,
    {
        let outputs = self.map_groups(ga, f)?;
        ga.with_data(outputs.concat())
    }
}
