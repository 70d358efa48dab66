//! Bounded fork-join pool for the per-frame image work.

use rayon::prelude::*;

/// A fixed-size worker pool whose `map` keeps results in input order.
pub struct WorkerPool {
    pool: rayon::ThreadPool,
}

impl WorkerPool {
    /// Builds a pool with `threads` workers, or rayon's default when `None`.
    pub fn new(threads: Option<usize>) -> Result<Self, rayon::ThreadPoolBuildError> {
        let mut builder = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("bingo-worker-{}", i));
        if let Some(threads) = threads {
            builder = builder.num_threads(threads.max(1));
        }
        Ok(Self { pool: builder.build()? })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Applies `f` to every item in parallel and blocks until all are done.
    ///
    /// `result[i]` is always `f(&items[i])`, whatever order the tasks finish in.
    pub fn map<T, R, F>(&self, items: &[T], f: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync + Send,
    {
        self.pool.install(|| items.par_iter().map(|item| f(item)).collect())
    }
}
