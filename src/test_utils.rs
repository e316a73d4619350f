use crate::pool::JobPool;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A started pool with a unique name, outside the registry so tests cannot
/// disturb each other or the process-wide default pool.
pub(crate) fn test_pool(concurrency: usize) -> Arc<JobPool> {
    static NEXT_POOL_ID: AtomicUsize = AtomicUsize::new(0);

    let id = NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed);
    let pool = JobPool::builder(format!("test-pool-{id}"))
        .concurrency(concurrency)
        .build();
    pool.start_workers();
    pool
}
