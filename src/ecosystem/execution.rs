//! Pluggable parallel-for used by grid builds and resolvers.
//!
//! Every data-parallel phase in the ecosystem has the same shape: a
//! contiguous range of snapshot indices, an independent computation per index
//! (or per batch of indices), and results collected back in index order. The
//! [`Executor`] runs that shape either on Bevy's [`ComputeTaskPool`] or inline
//! on the calling thread, so the resolvers keep a single code path.

use std::ops::Range;

use bevy::tasks::{ComputeTaskPool, TaskPool};
use serde::{Deserialize, Serialize};

use super::config::EcosystemConfig;

/// How the data-parallel phases are dispatched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStrategy {
    /// Fan out over the compute task pool and block until every batch is done.
    #[default]
    Parallel,
    /// Run every batch on the calling thread.
    Sequential,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Executor {
    strategy: ExecutionStrategy,
    batch_size: usize,
    min_parallel_len: usize,
}

impl Default for Executor {
    fn default() -> Self {
        Self::parallel(64)
    }
}

impl Executor {
    pub fn sequential() -> Self {
        Self {
            strategy: ExecutionStrategy::Sequential,
            batch_size: usize::MAX,
            min_parallel_len: usize::MAX,
        }
    }

    pub fn parallel(batch_size: usize) -> Self {
        Self {
            strategy: ExecutionStrategy::Parallel,
            batch_size: batch_size.max(1),
            min_parallel_len: 1,
        }
    }

    /// Inputs shorter than `min_parallel_len` run inline even in parallel mode.
    pub fn with_min_parallel_len(mut self, min_parallel_len: usize) -> Self {
        self.min_parallel_len = min_parallel_len.max(1);
        self
    }

    pub fn from_config(config: &EcosystemConfig) -> Self {
        match config.execution {
            ExecutionStrategy::Parallel => {
                Self::parallel(config.parallel_batch_size).with_min_parallel_len(config.min_parallel_len)
            }
            ExecutionStrategy::Sequential => Self::sequential(),
        }
    }

    pub fn strategy(&self) -> ExecutionStrategy {
        self.strategy
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Whether an input of `len` items would be dispatched to the task pool.
    pub fn runs_parallel(&self, len: usize) -> bool {
        self.strategy == ExecutionStrategy::Parallel && len >= self.min_parallel_len
    }

    /// Split `0..len` into contiguous batches and run `f` on each.
    ///
    /// Results come back in batch order. Blocks until all batches finished.
    pub fn map_batches<R, F>(&self, len: usize, f: F) -> Vec<R>
    where
        R: Send + 'static,
        F: Fn(Range<usize>) -> R + Sync,
    {
        if len == 0 {
            return Vec::new();
        }
        if !self.runs_parallel(len) {
            return vec![f(0..len)];
        }

        let pool = ComputeTaskPool::get_or_init(TaskPool::default);
        let batch_size = self.batch_size;
        let f = &f;

        let mut batches: Vec<(usize, R)> = pool.scope(|scope| {
            let mut start = 0;
            while start < len {
                let end = start.saturating_add(batch_size).min(len);
                scope.spawn(async move { (start, f(start..end)) });
                start = end;
            }
        });

        batches.sort_unstable_by_key(|(start, _)| *start);
        batches.into_iter().map(|(_, result)| result).collect()
    }

    /// Compute one value per index in `0..len`, in index order.
    pub fn map_indexed<T, F>(&self, len: usize, f: F) -> Vec<T>
    where
        T: Send + 'static,
        F: Fn(usize) -> T + Sync,
    {
        let mut out = Vec::with_capacity(len);
        for batch in self.map_batches(len, |range| range.map(&f).collect::<Vec<T>>()) {
            out.extend(batch);
        }
        out
    }
}
