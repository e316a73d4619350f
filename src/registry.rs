//! Process-wide pool registry.
//!
//! Materialized lazily on first use; lookups return the same pool instance
//! for the whole process lifetime. There is no teardown hook: hosts that
//! care about clean exits call [`shutdown`] themselves, after which every
//! dispatch discards its job.

use crate::pool::{JobPool, PoolBuilder};
use anyhow::{Result, bail};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};
use std::thread;
use tracing::info;

/// Name under which the default pool registers.
pub const DEFAULT_POOL_NAME: &str = "default";

static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

struct Registry {
    pools: DashMap<String, Arc<JobPool>>,
    alive: AtomicBool,
}

impl Registry {
    fn new() -> Self {
        Self {
            pools: DashMap::new(),
            alive: AtomicBool::new(true),
        }
    }

    fn get_or_create(&self, name: &str) -> Arc<JobPool> {
        if let Some(pool) = self.pools.get(name) {
            return Arc::clone(pool.value());
        }

        match self.pools.entry(name.to_string()) {
            Entry::Occupied(entry) => Arc::clone(entry.get()),
            Entry::Vacant(entry) => {
                let pool = JobPool::builder(name).build();
                self.install(&pool);
                entry.insert(Arc::clone(&pool));
                pool
            }
        }
    }

    /// Start the pool's workers, unless the process already shut down, in
    /// which case the pool is born stopped and every dispatch into it
    /// discards.
    fn install(&self, pool: &Arc<JobPool>) {
        if self.alive.load(Ordering::Acquire) {
            info!(pool = %pool.name(), concurrency = pool.concurrency(), "pool created");
            pool.start_workers();
        } else {
            pool.stop();
        }
    }
}

/// The pool registered under `name`, created with default settings on first
/// use.
pub fn get_pool(name: &str) -> Arc<JobPool> {
    REGISTRY.get_or_create(name)
}

/// The default pool, shared by every dispatch that names no pool.
pub fn default_pool() -> Arc<JobPool> {
    get_pool(DEFAULT_POOL_NAME)
}

/// Hardware parallelism minus one, floored at two. Leaves a core for the
/// dispatching thread.
pub(crate) fn default_concurrency() -> usize {
    let hardware = thread::available_parallelism().map_or(2, |n| n.get());
    hardware.saturating_sub(1).max(2)
}

pub(crate) fn register(builder: PoolBuilder) -> Result<Arc<JobPool>> {
    match REGISTRY.pools.entry(builder.name().to_string()) {
        Entry::Occupied(_) => bail!("pool '{}' is already registered", builder.name()),
        Entry::Vacant(entry) => {
            let pool = builder.build();
            REGISTRY.install(&pool);
            entry.insert(Arc::clone(&pool));
            Ok(pool)
        }
    }
}

pub(crate) fn pools() -> Vec<Arc<JobPool>> {
    REGISTRY
        .pools
        .iter()
        .map(|entry| Arc::clone(entry.value()))
        .collect()
}

/// Stop every pool, discard queued jobs and wait for all workers to exit.
///
/// Two-phase: every pool is flagged before any is joined, so jobs that
/// dispatch into sibling pools while draining cannot re-fill a queue that a
/// joined worker already left behind. Idempotent; after the first call
/// [`alive`] reports false and new dispatches resolve their futures as
/// canceled.
pub fn shutdown() {
    if !REGISTRY.alive.swap(false, Ordering::AcqRel) {
        return;
    }
    info!("shutting down all pools");

    let pools = pools();
    for pool in &pools {
        pool.stop();
    }
    for pool in &pools {
        pool.join();
    }
}

/// Whether [`shutdown`] has not yet run.
pub fn alive() -> bool {
    REGISTRY.alive.load(Ordering::Acquire)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Registry state is process-global, so tests here only exercise paths
    // that leave it usable for the rest of the suite. `shutdown` itself is
    // covered at the pool level in `pool::tests`.

    #[test]
    fn lookups_return_the_same_pool() {
        let a = get_pool("registry-identity");
        let b = get_pool("registry-identity");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn default_pool_exists_with_sane_concurrency() {
        let pool = default_pool();
        assert_eq!(pool.name(), DEFAULT_POOL_NAME);
        assert!(pool.concurrency() >= 2);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let first = JobPool::builder("registry-dup").concurrency(1).register();
        assert!(first.is_ok());

        let second = JobPool::builder("registry-dup").concurrency(1).register();
        assert!(second.is_err());
    }

    #[test]
    fn empty_pool_name_is_rejected() {
        assert!(JobPool::builder("").register().is_err());
    }
}
