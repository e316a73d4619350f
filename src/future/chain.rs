//! Continuation wiring: `then_dispatch` and `send_result_to`.
//!
//! A continuation becomes a real job only once its antecedent resolves with a
//! value, so chains never block a worker thread on an upstream result. A
//! canceled antecedent short-circuits: the continuation's promise resolves
//! canceled without a job ever being enqueued, and the signal keeps
//! propagating down the chain the same way.

use crate::cancel::CancelToken;
use crate::context::{Context, JobOpts};
use crate::dispatch::marker;
use crate::future::{BoxedContinuation, Future, Promise, Resolution};
use crate::job::{Job, JobOutcome, report_panic};
use crate::pool::JobPool;
use crate::registry;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

/// A closure that consumes an upstream result and produces the next stage's
/// value. Implemented for two shapes:
///
/// - `FnOnce(&In, &CancelToken) -> Out`, for stages that want to poll
///   cancellation;
/// - `FnOnce(&In) -> Out`, for short stages that do not.
///
/// The marker parameter `M` only disambiguates the two impls; callers never
/// name it.
pub trait Continuation<In, M>: Send + 'static {
    type Out: Clone + Default + Send + 'static;

    fn run(self, input: &In, token: &CancelToken) -> Self::Out;
}

impl<F, In, Out> Continuation<In, marker::WithToken> for F
where
    F: FnOnce(&In, &CancelToken) -> Out + Send + 'static,
    Out: Clone + Default + Send + 'static,
{
    type Out = Out;

    fn run(self, input: &In, token: &CancelToken) -> Out {
        self(input, token)
    }
}

impl<F, In, Out> Continuation<In, marker::ValueOnly> for F
where
    F: FnOnce(&In) -> Out + Send + 'static,
    Out: Clone + Default + Send + 'static,
{
    type Out = Out;

    fn run(self, input: &In, _token: &CancelToken) -> Out {
        self(input)
    }
}

impl<T: Clone + Default + Send + 'static> Future<T> {
    /// Schedule `next` to run on this future's value once it resolves.
    ///
    /// The continuation runs in the same pool as its antecedent and returns a
    /// future of its own, so stages compose. If this future is canceled the
    /// continuation never runs and its future resolves canceled.
    ///
    /// ```no_run
    /// use jobline::{CancelToken, dispatch};
    ///
    /// let doubled = dispatch(|_c: &CancelToken| 21)
    ///     .then_dispatch(|v: &i32, _c: &CancelToken| v * 2);
    /// assert_eq!(doubled.join(), 42);
    /// ```
    pub fn then_dispatch<M, C>(&self, next: C) -> Future<C::Out>
    where
        C: Continuation<T, M>,
    {
        self.send_result_to(next, &Context::new())
    }

    /// Like [`then_dispatch`](Self::then_dispatch), but with an explicit
    /// context so each stage can re-target pool, group, priority or cancel
    /// policy.
    pub fn send_result_to<M, C>(&self, next: C, ctx: &Context) -> Future<C::Out>
    where
        C: Continuation<T, M>,
    {
        let child = Promise::new();
        child.set_can_cancel(ctx.opts.contains(JobOpts::CAN_CANCEL));
        let result = child.future();

        let next_ctx = ctx.clone();
        let cont: BoxedContinuation<T> =
            Box::new(move |resolution, origin| match resolution {
                Resolution::Canceled => child.cancel(),
                Resolution::Value(value) => {
                    wire_continuation(child, value, next, next_ctx, origin)
                }
            });
        self.shared.register(cont);

        result
    }
}

/// Build the continuation job around an upstream value and enqueue it.
///
/// Pool choice: the stage context's pool if set, otherwise the antecedent's
/// origin pool, otherwise the default pool.
fn wire_continuation<In, M, C>(
    child: Promise<C::Out>,
    value: In,
    next: C,
    ctx: Context,
    origin: Option<Arc<JobPool>>,
) where
    In: Send + 'static,
    C: Continuation<In, M>,
{
    let pool = ctx
        .pool
        .clone()
        .or(origin)
        .unwrap_or_else(registry::default_pool);
    child.set_origin(&pool);

    let token = child.token().clone();
    let job_name = ctx.name.clone();
    let thunk = {
        let child = child.clone();
        let token = token.clone();
        Box::new(move || {
            if token.canceled() {
                child.cancel();
                return JobOutcome::Canceled;
            }
            match catch_unwind(AssertUnwindSafe(|| next.run(&value, &token))) {
                Ok(out) => {
                    child.resolve(out);
                    JobOutcome::Completed
                }
                Err(payload) => {
                    report_panic(job_name.as_deref(), &*payload);
                    child.cancel();
                    JobOutcome::Panicked
                }
            }
        })
    };

    pool.dispatch(Job::new(&ctx, token, thunk));
}
