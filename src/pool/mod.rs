//! Named pools of worker threads draining a priority queue.

use crate::job::Job;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use tracing::{debug, error, info, trace};

// Public API
pub mod builder;
pub use builder::PoolBuilder;

pub mod metrics;
pub use metrics::Metrics;

// Exports
pub(crate) mod queue;
use queue::PendingQueue;

mod worker;


use builder::ThreadNameFn;

/// A named scheduler: a set of worker threads sharing one dynamically
/// prioritized queue.
///
/// Pools are obtained from [`get_pool`](crate::get_pool) (created on first
/// use) or configured up front through [`JobPool::builder`]. They live for
/// the process lifetime; [`shutdown`](crate::shutdown) stops and joins all of
/// them, discarding queued jobs.
#[derive(Debug)]
pub struct JobPool {
    name: String,
    queue: Mutex<PendingQueue>,
    /// Signaled on every push and on shutdown or concurrency changes.
    work_available: Condvar,
    done: AtomicBool,
    target_concurrency: AtomicUsize,
    metrics: Metrics,
    threads: Mutex<Vec<thread::JoinHandle<()>>>,
    thread_name: ThreadNameFn,
    thread_stack_size: Option<usize>,
    /// Monotonic worker index feeding thread names.
    worker_seq: AtomicUsize,
}

impl JobPool {
    /// Start configuring a pool for explicit registration.
    pub fn builder(name: impl Into<String>) -> PoolBuilder {
        PoolBuilder::new(name)
    }

    pub(crate) fn new(
        name: String,
        concurrency: usize,
        thread_name: ThreadNameFn,
        thread_stack_size: Option<usize>,
    ) -> Arc<Self> {
        Arc::new(Self {
            name,
            queue: Mutex::new(PendingQueue::default()),
            work_available: Condvar::new(),
            done: AtomicBool::new(false),
            target_concurrency: AtomicUsize::new(concurrency.max(1)),
            metrics: Metrics::default(),
            threads: Mutex::new(Vec::new()),
            thread_name,
            thread_stack_size,
            worker_seq: AtomicUsize::new(0),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Target worker count. The live count can lag behind after a downward
    /// [`set_concurrency`](Self::set_concurrency); see
    /// [`Metrics::concurrency`] for the live value.
    pub fn concurrency(&self) -> usize {
        self.target_concurrency.load(Ordering::Acquire)
    }

    /// Adjust the worker count, with a floor of one.
    ///
    /// Upward changes spawn the new workers before returning. Downward
    /// changes are lazy: each surplus worker exits after finishing the job it
    /// is on, or immediately if it is idle.
    pub fn set_concurrency(self: &Arc<Self>, val: usize) {
        let val = val.max(1);
        self.target_concurrency.store(val, Ordering::Release);
        if self.done.load(Ordering::Acquire) {
            return;
        }
        debug!(pool = %self.name, concurrency = val, "concurrency change");
        self.start_workers();
        // Wake idle workers so surplus ones can retire.
        self.work_available.notify_all();
    }

    /// Accept a job: count it against its group, then enqueue and wake one
    /// worker. A stopped pool discards instead, resolving the job's promise
    /// as canceled so nothing downstream hangs.
    pub(crate) fn dispatch(&self, job: Job) {
        // The group must grow before the job becomes visible, so a join
        // racing this dispatch cannot slip through a zero.
        if let Some(group) = &job.group {
            group.acquire();
        }

        if self.done.load(Ordering::Acquire) {
            self.discard_job(job);
            return;
        }

        let mut queue = self.queue.lock();
        // Re-check under the lock; `stop` drains the queue right after
        // flipping the flag and must not miss this job.
        if self.done.load(Ordering::Acquire) {
            drop(queue);
            self.discard_job(job);
            return;
        }

        trace!(pool = %self.name, job = ?job.name, "dispatch");
        queue.push(job);
        self.metrics.pending.fetch_add(1, Ordering::Relaxed);
        self.metrics.total.fetch_add(1, Ordering::Relaxed);
        self.work_available.notify_one();
    }

    /// Discard every queued job. Each one resolves canceled and releases its
    /// group; running jobs are unaffected.
    pub fn cancel_all(&self) {
        let drained = {
            let mut queue = self.queue.lock();
            if queue.is_empty() {
                return;
            }
            queue.drain()
        };
        for job in drained {
            self.metrics.pending.fetch_sub(1, Ordering::Relaxed);
            self.discard_job(job);
        }
    }

    /// Block until every worker thread has exited. Meaningful after a stop;
    /// calling it on a running pool parks the caller until the pool is
    /// stopped elsewhere.
    pub fn join(&self) {
        let handles: Vec<_> = self.threads.lock().drain(..).collect();
        for handle in handles {
            if handle.join().is_err() {
                // Worker loops contain panics; reaching this means a bug.
                error!(pool = %self.name, "worker thread terminated by panic");
            }
        }
    }

    /// Flag shutdown and discard the backlog. Workers finish their current
    /// job and exit; idempotent.
    pub(crate) fn stop(&self) {
        if self.done.swap(true, Ordering::AcqRel) {
            return;
        }
        info!(pool = %self.name, "stopping pool");

        let drained = {
            let mut queue = self.queue.lock();
            debug!(pool = %self.name, discarded = queue.len(), "discarding backlog");
            self.work_available.notify_all();
            queue.drain()
        };
        for job in drained {
            self.metrics.pending.fetch_sub(1, Ordering::Relaxed);
            self.discard_job(job);
        }
    }

    /// Spawn workers until the live count meets the target. The handle list
    /// lock doubles as the spawn serializer.
    pub(crate) fn start_workers(self: &Arc<Self>) {
        let mut threads = self.threads.lock();
        while self.metrics.concurrency.load(Ordering::Acquire)
            < self.target_concurrency.load(Ordering::Acquire)
        {
            if self.done.load(Ordering::Acquire) {
                break;
            }
            // Reserve the slot before the thread exists so a concurrent
            // spawner cannot overshoot the target.
            self.metrics.concurrency.fetch_add(1, Ordering::AcqRel);

            let index = self.worker_seq.fetch_add(1, Ordering::Relaxed);
            let mut builder = thread::Builder::new().name((self.thread_name.0)(&self.name, index));
            if let Some(stack_size) = self.thread_stack_size {
                builder = builder.stack_size(stack_size);
            }

            let pool = Arc::clone(self);
            let handle = builder
                .spawn(move || worker::worker_loop(pool))
                .expect("failed to spawn worker thread");
            threads.push(handle);
        }
    }

    fn discard_job(&self, job: Job) {
        job.discard();
        self.metrics.canceled.fetch_add(1, Ordering::Relaxed);
    }

    fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }
}
