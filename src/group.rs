use crate::cancel::Cancelable;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// How long a cancelable join sleeps between checks of the cancel source.
const JOIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Counter-based barrier over a batch of jobs.
///
/// Attach a group to a [`Context`] and every job dispatched through that
/// context counts against the group. The counter is incremented before the
/// job is enqueued and decremented exactly once when the job completes, by
/// any path: a normal return, cancellation, or a panic inside the closure.
///
/// `join` blocks until the counter reaches zero. A group is reusable; more
/// jobs may be dispatched into it after a join returns, and a single group
/// may span several pools.
///
/// [`Context`]: crate::context::Context
///
/// ```no_run
/// use jobline::{Context, JobGroup};
///
/// let group = JobGroup::new();
/// let ctx = Context::new().with_group(&group);
/// for i in 0..8 {
///     ctx.dispatch(move || println!("task {i}"));
/// }
/// group.join();
/// ```
#[derive(Clone, Debug, Default)]
pub struct JobGroup {
    inner: Arc<GroupInner>,
}

#[derive(Debug, Default)]
struct GroupInner {
    count: Mutex<usize>,
    zero: Condvar,
    canceled: AtomicBool,
}

impl JobGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Outstanding jobs in the group.
    pub fn count(&self) -> usize {
        *self.inner.count.lock()
    }

    /// Flag the whole group as canceled. Jobs from this group that have not
    /// started yet will have their tokens set by the worker that picks them
    /// up; running jobs observe it through their own token polling.
    pub fn cancel(&self) {
        self.inner.canceled.store(true, Ordering::Release);
    }

    pub fn canceled(&self) -> bool {
        self.inner.canceled.load(Ordering::Acquire)
    }

    /// Block until the counter reaches zero. Returns immediately if it
    /// already is. All waiters are released together.
    pub fn join(&self) {
        let mut count = self.inner.count.lock();
        while *count > 0 {
            self.inner.zero.wait(&mut count);
        }
    }

    /// Like [`join`](Self::join), but also returns once `cancel` reports
    /// canceled, even if jobs are still outstanding.
    pub fn join_cancelable(&self, cancel: &impl Cancelable) {
        let mut count = self.inner.count.lock();
        while *count > 0 && !cancel.canceled() {
            self.inner.zero.wait_for(&mut count, JOIN_POLL_INTERVAL);
        }
    }

    /// Force the counter back to zero and release all waiters.
    ///
    /// Recovery hatch only: any job still outstanding will over-decrement
    /// nothing (release saturates at zero), but the barrier semantics for the
    /// current batch are lost.
    pub fn reset(&self) {
        let mut count = self.inner.count.lock();
        *count = 0;
        self.inner.zero.notify_all();
    }

    pub(crate) fn acquire(&self) {
        *self.inner.count.lock() += 1;
    }

    pub(crate) fn release(&self) {
        let mut count = self.inner.count.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.inner.zero.notify_all();
        }
    }
}
