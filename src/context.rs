use crate::dispatch::Dispatchable;
use crate::group::JobGroup;
use crate::pool::JobPool;
use crate::registry;
use bitflags::bitflags;
use std::fmt;
use std::sync::Arc;

/// Priority evaluator attached to a job. Called by the scheduler every time it
/// selects the next job, so it must be cheap and must not block.
pub type PriorityFn = Arc<dyn Fn() -> f32 + Send + Sync + 'static>;

bitflags! {
    /// Per-dispatch policy flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct JobOpts: u8 {
        /// When the last [`Future`] referring to the job is dropped before the
        /// job resolves, its cancel token is set automatically. Clearing this
        /// flag pins the job to run regardless of future lifetime.
        ///
        /// [`Future`]: crate::future::Future
        const CAN_CANCEL = 1;
    }
}

impl Default for JobOpts {
    fn default() -> Self {
        JobOpts::CAN_CANCEL
    }
}

/// Options controlling how a job is dispatched.
///
/// A default context targets the default pool, belongs to no group, runs at
/// priority 0 and allows auto-cancellation on abandon.
///
/// ```no_run
/// use jobline::{Context, JobGroup, get_pool};
///
/// let group = JobGroup::new();
/// let ctx = Context::new()
///     .with_pool(&get_pool("render"))
///     .with_group(&group)
///     .with_priority(|| 10.0);
///
/// ctx.dispatch(|| println!("hello from a worker"));
/// group.join();
/// ```
#[derive(Clone, Default)]
pub struct Context {
    pub(crate) name: Option<String>,
    pub(crate) pool: Option<Arc<JobPool>>,
    pub(crate) group: Option<JobGroup>,
    pub(crate) priority: Option<PriorityFn>,
    pub(crate) opts: JobOpts,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a debug name, surfaced in log events about the job.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Target a specific pool instead of the default pool.
    pub fn with_pool(mut self, pool: &Arc<JobPool>) -> Self {
        self.pool = Some(Arc::clone(pool));
        self
    }

    /// Count dispatched jobs against `group`, so `group.join()` can wait for
    /// the whole batch.
    pub fn with_group(mut self, group: &JobGroup) -> Self {
        self.group = Some(group.clone());
        self
    }

    /// Install a priority evaluator. Higher values run sooner; the evaluator
    /// is re-run at every scheduling decision, so time-varying priorities work
    /// without re-enqueueing.
    pub fn with_priority<F>(mut self, f: F) -> Self
    where
        F: Fn() -> f32 + Send + Sync + 'static,
    {
        self.priority = Some(Arc::new(f));
        self
    }

    pub fn with_opts(mut self, opts: JobOpts) -> Self {
        self.opts = opts;
        self
    }

    /// Convenience for toggling [`JobOpts::CAN_CANCEL`].
    pub fn can_cancel(mut self, yes: bool) -> Self {
        self.opts.set(JobOpts::CAN_CANCEL, yes);
        self
    }

    /// Dispatch `work` with this context. See [`dispatch`](crate::dispatch())
    /// for the accepted closure shapes.
    pub fn dispatch<M, W>(&self, work: W) -> W::Ret
    where
        W: Dispatchable<M>,
    {
        work.dispatch_with(self)
    }

    pub(crate) fn target_pool(&self) -> Arc<JobPool> {
        self.pool.clone().unwrap_or_else(registry::default_pool)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("name", &self.name)
            .field("pool", &self.pool.as_ref().map(|p| p.name()))
            .field("group", &self.group)
            .field("priority", &self.priority.as_ref().map(|_| "<function>"))
            .field("opts", &self.opts)
            .finish()
    }
}
