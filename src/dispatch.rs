//! Dispatch facade: one entry point, several closure shapes.
//!
//! `dispatch` is generic over the shape of the work it is given. A plain
//! `FnOnce()` is fire-and-forget; a closure taking a [`CancelToken`] produces
//! a value and yields a [`Future`]; a closure taking a [`Promise`] drives
//! resolution itself. Each shape is one impl of [`Dispatchable`], selected by
//! a marker type the compiler infers from the closure's signature, so call
//! sites read like an overload set.
//!
//! Whatever the shape, the closure's captured state is moved into the job,
//! normalized to a nullary thunk, and the job owns it until completion.

use crate::cancel::CancelToken;
use crate::context::{Context, JobOpts};
use crate::future::{Future, Promise};
use crate::job::{Job, JobOutcome, report_panic};
use std::panic::{AssertUnwindSafe, catch_unwind};

/// Marker types distinguishing the closure-shape impls of [`Dispatchable`]
/// and [`Continuation`](crate::future::Continuation). Never constructed;
/// callers let inference pick them.
pub mod marker {
    use std::marker::PhantomData;

    /// `FnOnce()`, fire-and-forget.
    pub enum Fire {}

    /// `FnOnce(&CancelToken) -> T`, result-producing.
    pub struct Producing<T>(PhantomData<T>);

    /// `FnOnce(&Promise<T>)`, user-driven resolution.
    pub struct UserDriven<T>(PhantomData<T>);

    /// Continuation `FnOnce(&In, &CancelToken) -> Out`.
    pub enum WithToken {}

    /// Continuation `FnOnce(&In) -> Out`.
    pub enum ValueOnly {}
}

/// Work that can be turned into a job. See the [module docs](self) for the
/// accepted shapes.
pub trait Dispatchable<M>: Send + 'static {
    /// `()` for fire-and-forget work, `Future<T>` otherwise.
    type Ret;

    fn dispatch_with(self, ctx: &Context) -> Self::Ret;
}

/// Dispatch `work` into the default pool with default options.
///
/// Use [`Context::dispatch`] to pick a pool, group, priority or cancel
/// policy.
///
/// ```no_run
/// use jobline::{CancelToken, dispatch};
///
/// // Fire-and-forget.
/// dispatch(|| println!("ran on a worker"));
///
/// // Result-producing; join blocks until the worker resolves it.
/// let answer = dispatch(|_c: &CancelToken| 6 * 7);
/// assert_eq!(answer.join(), 42);
/// ```
pub fn dispatch<M, W>(work: W) -> W::Ret
where
    W: Dispatchable<M>,
{
    work.dispatch_with(&Context::new())
}

impl<F> Dispatchable<marker::Fire> for F
where
    F: FnOnce() + Send + 'static,
{
    type Ret = ();

    fn dispatch_with(self, ctx: &Context) {
        let token = CancelToken::new();
        let job_name = ctx.name.clone();
        let thunk = {
            let token = token.clone();
            Box::new(move || {
                if token.canceled() {
                    return JobOutcome::Canceled;
                }
                match catch_unwind(AssertUnwindSafe(|| self())) {
                    Ok(()) => JobOutcome::Completed,
                    Err(payload) => {
                        report_panic(job_name.as_deref(), &*payload);
                        JobOutcome::Panicked
                    }
                }
            })
        };
        ctx.target_pool().dispatch(Job::new(ctx, token, thunk));
    }
}

impl<F, T> Dispatchable<marker::Producing<T>> for F
where
    F: FnOnce(&CancelToken) -> T + Send + 'static,
    T: Clone + Default + Send + 'static,
{
    type Ret = Future<T>;

    fn dispatch_with(self, ctx: &Context) -> Future<T> {
        let pool = ctx.target_pool();

        let promise = Promise::new();
        promise.set_can_cancel(ctx.opts.contains(JobOpts::CAN_CANCEL));
        promise.set_origin(&pool);
        let result = promise.future();

        let token = promise.token().clone();
        let job_name = ctx.name.clone();
        let thunk = {
            let token = token.clone();
            Box::new(move || {
                if token.canceled() {
                    promise.cancel();
                    return JobOutcome::Canceled;
                }
                match catch_unwind(AssertUnwindSafe(|| self(&token))) {
                    Ok(value) => {
                        promise.resolve(value);
                        JobOutcome::Completed
                    }
                    Err(payload) => {
                        report_panic(job_name.as_deref(), &*payload);
                        promise.cancel();
                        JobOutcome::Panicked
                    }
                }
            })
        };

        pool.dispatch(Job::new(ctx, token, thunk));
        result
    }
}

impl<F, T> Dispatchable<marker::UserDriven<T>> for F
where
    F: FnOnce(&Promise<T>) + Send + 'static,
    T: Clone + Default + Send + 'static,
{
    type Ret = Future<T>;

    fn dispatch_with(self, ctx: &Context) -> Future<T> {
        let pool = ctx.target_pool();

        let promise = Promise::new();
        promise.set_can_cancel(ctx.opts.contains(JobOpts::CAN_CANCEL));
        promise.set_origin(&pool);
        let result = promise.future();

        let token = promise.token().clone();
        let job_name = ctx.name.clone();
        let thunk = {
            let token = token.clone();
            Box::new(move || {
                if token.canceled() {
                    promise.cancel();
                    return JobOutcome::Canceled;
                }
                match catch_unwind(AssertUnwindSafe(|| self(&promise))) {
                    // The closure may have stashed a clone of the promise to
                    // resolve later; if it did not, dropping the last
                    // producer resolves the slot as canceled rather than
                    // stranding joiners.
                    Ok(()) => JobOutcome::Completed,
                    Err(payload) => {
                        report_panic(job_name.as_deref(), &*payload);
                        promise.cancel();
                        JobOutcome::Panicked
                    }
                }
            })
        };

        pool.dispatch(Job::new(ctx, token, thunk));
        result
    }
}
