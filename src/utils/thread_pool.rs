use once_cell::sync::OnceCell;
use rayon::ThreadPoolBuilder;
use std::sync::Arc;

static THREAD_POOL: OnceCell<Arc<rayon::ThreadPool>> = OnceCell::new();

/// Build a hashing pool with `num_threads` workers
fn build_pool(num_threads: usize) -> Result<rayon::ThreadPool, rayon::ThreadPoolBuildError> {
    ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .thread_name(|i| format!("fixwatch-worker-{i}"))
        .build()
}

/// Initialize the global thread pool with the specified number of threads
///
/// # Errors
///
/// Returns an error if the thread pool cannot be initialized
pub fn init_thread_pool(num_threads: usize) -> anyhow::Result<()> {
    let pool = build_pool(num_threads)?;

    THREAD_POOL
        .set(Arc::new(pool))
        .map_err(|_| anyhow::anyhow!("Thread pool already initialized"))?;

    Ok(())
}

/// Get the global thread pool, initializing with default settings if needed
///
/// Returns `None` only if no pool could be built at all; callers then hash on the
/// current thread.
#[must_use]
pub fn get_thread_pool() -> Option<Arc<rayon::ThreadPool>> {
    THREAD_POOL
        .get_or_try_init(|| build_pool(num_cpus::get().min(8)).map(Arc::new))
        .ok()
        .cloned()
}

/// Run a function in the configured thread pool
pub fn run_in_pool<F, R>(f: F) -> R
where
    F: FnOnce() -> R + Send,
    R: Send,
{
    match get_thread_pool() {
        Some(pool) => pool.install(f),
        None => f(),
    }
}

/// Configure and use the thread pool from config
///
/// # Errors
///
/// Returns an error if the thread pool has already been initialized
pub fn configure_from_config(config: &crate::config::Config) -> anyhow::Result<()> {
    if config.performance.parallel_threads > 0 {
        init_thread_pool(config.performance.parallel_threads)?;
    }
    Ok(())
}

pub use rayon::prelude::*;

mod num_cpus {
    use std::sync::LazyLock;

    static NUM_CPUS: LazyLock<usize> = LazyLock::new(|| {
        std::thread::available_parallelism()
            .map(std::num::NonZeroUsize::get)
            .unwrap_or(1)
    });

    pub fn get() -> usize {
        *NUM_CPUS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_in_pool_executes() {
        let sum: u64 = run_in_pool(|| (1..=100u64).into_par_iter().sum());
        assert_eq!(sum, 5050);
    }
}
