//! Parallel processing strategies

use rayon::prelude::*;
use rayon::ThreadPoolBuildError;

/// Processing mode for work spread over independent items
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingMode {
    /// Single-threaded processing
    Sequential,
    /// Parallel processing using all available cores
    Parallel,
    /// Parallel with specified number of threads
    ParallelWith(usize),
}

impl Default for ProcessingMode {
    fn default() -> Self {
        ProcessingMode::Parallel
    }
}

impl ProcessingMode {
    /// Mode for a worker count: 0 means all cores, 1 sequential
    pub fn from_workers(workers: usize) -> Self {
        match workers {
            0 => ProcessingMode::Parallel,
            1 => ProcessingMode::Sequential,
            n => ProcessingMode::ParallelWith(n),
        }
    }

    /// Number of threads work will run on
    pub fn threads(&self) -> usize {
        match self {
            ProcessingMode::Sequential => 1,
            ProcessingMode::Parallel => num_cpus(),
            ProcessingMode::ParallelWith(n) => *n,
        }
    }

    fn pool(threads: usize) -> Result<rayon::ThreadPool, ThreadPoolBuildError> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("photomon-worker-{}", i))
            .build()
    }
}

/// Strategy for parallel execution
pub trait ParallelStrategy {
    /// Execute a function over indices in parallel
    fn par_for_each<F>(
        &self,
        range: std::ops::Range<usize>,
        f: F,
    ) -> Result<(), ThreadPoolBuildError>
    where
        F: Fn(usize) + Sync + Send;

    /// Map a function over indices and collect results in index order
    fn par_map<T, F>(
        &self,
        range: std::ops::Range<usize>,
        f: F,
    ) -> Result<Vec<T>, ThreadPoolBuildError>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send;
}

impl ParallelStrategy for ProcessingMode {
    fn par_for_each<F>(
        &self,
        range: std::ops::Range<usize>,
        f: F,
    ) -> Result<(), ThreadPoolBuildError>
    where
        F: Fn(usize) + Sync + Send,
    {
        match self {
            ProcessingMode::Sequential => {
                for i in range {
                    f(i);
                }
            }
            ProcessingMode::Parallel => {
                range.into_par_iter().for_each(f);
            }
            ProcessingMode::ParallelWith(threads) => {
                Self::pool(*threads)?.install(|| {
                    range.into_par_iter().for_each(f);
                });
            }
        }
        Ok(())
    }

    fn par_map<T, F>(
        &self,
        range: std::ops::Range<usize>,
        f: F,
    ) -> Result<Vec<T>, ThreadPoolBuildError>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        Ok(match self {
            ProcessingMode::Sequential => range.map(f).collect(),
            ProcessingMode::Parallel => range.into_par_iter().map(f).collect(),
            ProcessingMode::ParallelWith(threads) => {
                Self::pool(*threads)?.install(|| range.into_par_iter().map(f).collect())
            }
        })
    }
}

/// Get the number of available CPU cores
pub fn num_cpus() -> usize {
    rayon::current_num_threads()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_from_workers() {
        assert_eq!(ProcessingMode::from_workers(0), ProcessingMode::Parallel);
        assert_eq!(ProcessingMode::from_workers(1), ProcessingMode::Sequential);
        assert_eq!(ProcessingMode::from_workers(3), ProcessingMode::ParallelWith(3));
        assert_eq!(ProcessingMode::from_workers(3).threads(), 3);
    }

    #[test]
    fn test_par_map_keeps_order() {
        for mode in [
            ProcessingMode::Sequential,
            ProcessingMode::Parallel,
            ProcessingMode::ParallelWith(2),
        ] {
            let out = mode.par_map(0..100, |i| i * 2).unwrap();
            assert_eq!(out, (0..100).map(|i| i * 2).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_par_for_each_visits_all() {
        let count = AtomicUsize::new(0);
        ProcessingMode::ParallelWith(4)
            .par_for_each(0..50, |_| {
                count.fetch_add(1, Ordering::Relaxed);
            })
            .unwrap();
        assert_eq!(count.load(Ordering::Relaxed), 50);
    }
}
