//! # Photomon Parallel
//!
//! Processing-mode strategies for spreading independent work items
//! (files, rows) over a Rayon thread pool.

pub mod strategy;

pub use rayon::ThreadPoolBuildError;
pub use strategy::{num_cpus, ParallelStrategy, ProcessingMode};
