use crate::pool::JobPool;
use crate::registry;
use anyhow::{Result, bail};
use std::fmt;
use std::sync::Arc;

/// Generates worker thread names from the pool name and a per-pool worker
/// index.
#[derive(Clone)]
pub(crate) struct ThreadNameFn(pub(crate) Arc<dyn Fn(&str, usize) -> String + Send + Sync>);

pub(crate) fn default_thread_name_fn() -> ThreadNameFn {
    ThreadNameFn(Arc::new(|pool, worker| format!("{pool}-worker-{worker}")))
}

impl fmt::Debug for ThreadNameFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ThreadNameFn").field(&"<function>").finish()
    }
}

/// Configures and registers a pool ahead of its first implicit use.
///
/// `get_pool` creates pools on demand with default settings; build one
/// explicitly when you need a different concurrency, thread naming or stack
/// size. Registration fails if the name is already taken, since a pool's
/// configuration is fixed for the process lifetime.
///
/// ```no_run
/// use jobline::JobPool;
///
/// let pool = JobPool::builder("io")
///     .concurrency(4)
///     .thread_stack_size(512 * 1024)
///     .register()
///     .expect("pool name unused");
/// assert_eq!(pool.name(), "io");
/// ```
#[derive(Debug)]
pub struct PoolBuilder {
    name: String,
    concurrency: Option<usize>,
    thread_name: ThreadNameFn,
    thread_stack_size: Option<usize>,
}

impl PoolBuilder {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            concurrency: None,
            thread_name: default_thread_name_fn(),
            thread_stack_size: None,
        }
    }

    /// Number of worker threads. Defaults to the hardware parallelism minus
    /// one, with a floor of two.
    ///
    /// # Panics
    ///
    /// Panics if `val` is zero.
    #[track_caller]
    pub fn concurrency(mut self, val: usize) -> Self {
        assert!(val > 0, "concurrency cannot be set to 0");
        self.concurrency = Some(val);
        self
    }

    /// Sets the function generating worker thread names. Receives the pool
    /// name and the worker index; the default yields `{pool}-worker-{n}`.
    pub fn thread_name_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, usize) -> String + Send + Sync + 'static,
    {
        self.thread_name = ThreadNameFn(Arc::new(f));
        self
    }

    /// Stack size in bytes for worker threads. The platform minimum applies
    /// if this is smaller.
    pub fn thread_stack_size(mut self, val: usize) -> Self {
        self.thread_stack_size = Some(val);
        self
    }

    /// Install the pool into the process-wide registry and start its
    /// workers. Fails on an empty or already-registered name.
    pub fn register(self) -> Result<Arc<JobPool>> {
        if self.name.is_empty() {
            bail!("pool name cannot be empty");
        }
        registry::register(self)
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Construct the pool without registering or starting it.
    pub(crate) fn build(self) -> Arc<JobPool> {
        let concurrency = self
            .concurrency
            .unwrap_or_else(registry::default_concurrency);
        JobPool::new(
            self.name,
            concurrency,
            self.thread_name,
            self.thread_stack_size,
        )
    }
}
