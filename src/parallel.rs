//! Parallelism helpers for the batched sample loop
//!
//! The three convolution passes process batched (rank-3) inputs one sample
//! at a time, and each sample's windows touch disjoint memory. That makes
//! the per-sample loop safe to spread across threads, which this module
//! does via rayon when the `parallel` feature is enabled, with a sequential
//! fallback otherwise.
//!
//! Parameter-gradient accumulation is the exception: `grad_weight` and
//! `grad_bias` are shared accumulation targets across all samples, so that
//! pass stays sequential regardless of this module.

use crate::error::ConvResult;

/// Configure the global thread pool with the specified number of threads.
///
/// This must be called before any parallel operations. If called multiple
/// times, only the first call takes effect (rayon limitation).
///
/// # Arguments
///
/// * `num_threads` - Number of threads to use. If None, uses rayon's
///   default (typically the number of logical CPUs).
///
/// # Returns
///
/// Ok(actual_threads) on success.
#[cfg(feature = "parallel")]
pub fn configure_thread_pool(num_threads: Option<u32>) -> ConvResult<usize> {
    use rayon::ThreadPoolBuilder;

    let builder = ThreadPoolBuilder::new();
    let builder = if let Some(n) = num_threads {
        builder.num_threads(n as usize)
    } else {
        builder
    };

    match builder.build_global() {
        Ok(()) => Ok(rayon::current_num_threads()),
        Err(_) => {
            // Thread pool already initialized - return current thread count
            Ok(rayon::current_num_threads())
        }
    }
}

/// Sequential fallback - no thread pool to configure.
#[cfg(not(feature = "parallel"))]
pub fn configure_thread_pool(num_threads: Option<u32>) -> ConvResult<usize> {
    let _ = num_threads;
    Ok(1)
}

/// Parallel map over a range of sample indices.
///
/// When the `parallel` feature is enabled, this uses rayon's parallel
/// iterator. Otherwise, it falls back to sequential iteration. Results are
/// returned in index order either way (deterministic).
#[cfg(feature = "parallel")]
pub fn parallel_map<T, F>(range: std::ops::Range<usize>, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Send + Sync,
{
    use rayon::prelude::*;
    range.into_par_iter().map(f).collect()
}

/// Sequential fallback when `parallel` feature is disabled.
#[cfg(not(feature = "parallel"))]
pub fn parallel_map<T, F>(range: std::ops::Range<usize>, f: F) -> Vec<T>
where
    F: Fn(usize) -> T,
{
    range.map(f).collect()
}

/// Parallel map that collects Results, short-circuiting on first error.
#[cfg(feature = "parallel")]
pub fn parallel_try_map<T, F>(range: std::ops::Range<usize>, f: F) -> ConvResult<Vec<T>>
where
    T: Send,
    F: Fn(usize) -> ConvResult<T> + Send + Sync,
{
    use rayon::prelude::*;
    range.into_par_iter().map(f).collect()
}

/// Sequential fallback for try_map.
#[cfg(not(feature = "parallel"))]
pub fn parallel_try_map<T, F>(range: std::ops::Range<usize>, f: F) -> ConvResult<Vec<T>>
where
    F: Fn(usize) -> ConvResult<T>,
{
    range.map(f).collect()
}

/// Check if parallel execution is available.
#[cfg(feature = "parallel")]
pub fn is_parallel_available() -> bool {
    true
}

/// Sequential fallback - parallel not available.
#[cfg(not(feature = "parallel"))]
pub fn is_parallel_available() -> bool {
    false
}

/// Get the number of threads available for parallel execution.
#[cfg(feature = "parallel")]
pub fn thread_count() -> usize {
    rayon::current_num_threads()
}

/// Sequential fallback - always 1 thread.
#[cfg(not(feature = "parallel"))]
pub fn thread_count() -> usize {
    1
}
