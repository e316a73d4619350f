//! In-process job scheduler for offloading short-to-medium compute tasks onto
//! pools of worker threads, without an async runtime.
//!
//! The pieces:
//!
//! - [`dispatch`] hands a closure to a pool and, depending on the closure's
//!   shape, returns nothing or a [`Future`] for its result.
//! - [`Context`] carries per-dispatch options: target pool, [`JobGroup`],
//!   dynamic priority, cancel policy.
//! - [`Future::then_dispatch`] chains dependent stages; a canceled stage
//!   short-circuits the rest of its chain.
//! - [`get_pool`] / [`JobPool::builder`] manage named pools in a
//!   process-wide registry; [`shutdown`] tears everything down.
//!
//! ```no_run
//! use jobline::{CancelToken, Context, JobGroup, dispatch};
//!
//! // Offload work and wait for the batch.
//! let group = JobGroup::new();
//! let ctx = Context::new().with_group(&group);
//! for i in 0..8 {
//!     ctx.dispatch(move || println!("task {i}"));
//! }
//! group.join();
//!
//! // Chain dependent computations; nothing blocks a worker on an upstream.
//! let total = dispatch(|_c: &CancelToken| 21)
//!     .then_dispatch(|v: &i32, _c: &CancelToken| v * 2);
//! assert_eq!(total.join(), 42);
//!
//! jobline::shutdown();
//! ```
//!
//! Cancellation is cooperative: a job that is already running is never
//! interrupted, it can only notice its [`CancelToken`]. Dropping the last
//! [`Future`] of a pending job sets the token automatically unless the
//! dispatch opted out via [`Context::can_cancel`].
//!
//! Worker threads must not `join` a future produced by a job in their own
//! pool; with enough such jobs in flight every worker ends up waiting and
//! the pool deadlocks. Chains built with
//! [`then_dispatch`](Future::then_dispatch) are safe, they never park a
//! worker on an antecedent.

pub mod cancel;
pub use cancel::{CancelToken, Cancelable};

pub mod context;
pub use context::{Context, JobOpts, PriorityFn};

pub mod dispatch;
pub use dispatch::{Dispatchable, dispatch};

pub mod future;
pub use future::{Continuation, Future, Promise};

pub mod group;
pub use group::JobGroup;

pub mod pool;
pub use pool::metrics::{total_canceled, total_pending, total_running};
pub use pool::{JobPool, Metrics, PoolBuilder};

pub mod registry;
pub use registry::{alive, default_pool, get_pool, shutdown};

// Exports
mod job;

mod utils;

#[cfg(test)]
pub(crate) mod test_utils;
