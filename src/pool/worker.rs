use crate::job::JobOutcome;
use crate::pool::JobPool;
use crate::utils::ScopeGuard;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::trace;

/// Body of every worker thread.
///
/// Waits for work, pops the best-priority job, runs it, repeats. Exits when
/// the pool stops or when the live worker count exceeds the target after a
/// downward concurrency change. The job's own run path resolves its promise
/// and releases its group, so this loop only handles selection and counters.
pub(super) fn worker_loop(pool: Arc<JobPool>) {
    trace!(pool = %pool.name(), "worker started");

    loop {
        let job = {
            let mut queue = pool.queue.lock();
            loop {
                if pool.is_done() {
                    pool.metrics.concurrency.fetch_sub(1, Ordering::AcqRel);
                    trace!(pool = %pool.name(), "worker exiting on shutdown");
                    return;
                }
                if try_retire(&pool) {
                    trace!(pool = %pool.name(), "worker retired");
                    return;
                }
                if let Some(job) = queue.pop_best() {
                    break job;
                }
                pool.work_available.wait(&mut queue);
            }
        };

        pool.metrics.pending.fetch_sub(1, Ordering::Relaxed);
        pool.metrics.running.fetch_add(1, Ordering::Relaxed);
        let running = ScopeGuard::new(|| {
            pool.metrics.running.fetch_sub(1, Ordering::Relaxed);
        });

        // A canceled group condemns its not-yet-started jobs.
        if job.group.as_ref().is_some_and(|g| g.canceled()) {
            job.token.cancel();
        }

        trace!(pool = %pool.name(), job = ?job.name, "running job");
        let outcome = job.run();
        if outcome != JobOutcome::Completed {
            pool.metrics.canceled.fetch_add(1, Ordering::Relaxed);
        }
        drop(running);
    }
}

/// One surplus worker may exit per successful count decrement; the CAS keeps
/// a burst of workers from dropping the pool below target.
fn try_retire(pool: &JobPool) -> bool {
    loop {
        let live = pool.metrics.concurrency.load(Ordering::Acquire);
        let target = pool.target_concurrency.load(Ordering::Acquire);
        if live <= target {
            return false;
        }
        if pool
            .metrics
            .concurrency
            .compare_exchange(live, live - 1, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            return true;
        }
    }
}
