use crate::cancel::CancelToken;
use crate::context::{Context, PriorityFn};
use crate::group::JobGroup;
use crate::utils::ScopeGuard;
use std::fmt;
use tracing::error;

/// What happened when a job's thunk was invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JobOutcome {
    /// The closure ran to completion and the promise carries its value.
    Completed,
    /// The token was set before the closure ran; the promise resolved
    /// canceled and the closure was never invoked.
    Canceled,
    /// The closure panicked. The panic was contained in the worker and the
    /// promise resolved canceled.
    Panicked,
}

/// A unit of deferred work plus its scheduling metadata.
///
/// The thunk owns the captured closure state and the job's promise; it
/// resolves the promise on every path, so a future can never observe a job
/// that silently vanished. Thunks are normalized at dispatch: whatever shape
/// the user closure had, by the time a `Job` exists it is `FnOnce() ->
/// JobOutcome`.
pub(crate) struct Job {
    pub(crate) name: Option<String>,
    pub(crate) priority: Option<PriorityFn>,
    pub(crate) group: Option<JobGroup>,
    pub(crate) token: CancelToken,
    /// Insertion order within the owning queue, the FIFO tie-break.
    pub(crate) seq: u64,
    thunk: Box<dyn FnOnce() -> JobOutcome + Send>,
}

impl Job {
    pub(crate) fn new(
        ctx: &Context,
        token: CancelToken,
        thunk: Box<dyn FnOnce() -> JobOutcome + Send>,
    ) -> Self {
        Self {
            name: ctx.name.clone(),
            priority: ctx.priority.clone(),
            group: ctx.group.clone(),
            token,
            seq: 0,
            thunk,
        }
    }

    /// Current priority of this job. Re-evaluated on every call.
    pub(crate) fn priority_value(&self) -> f32 {
        self.priority.as_ref().map_or(0.0, |p| p())
    }

    /// Invoke the thunk. The group is released exactly once, even if the
    /// thunk itself unwinds.
    pub(crate) fn run(self) -> JobOutcome {
        let group = self.group;
        let _release = group.as_ref().map(|g| ScopeGuard::new(|| g.release()));

        (self.thunk)()
    }

    /// Cancel the token and run the resolve-only path. The user closure is
    /// not invoked; the promise resolves canceled and the group is released.
    pub(crate) fn discard(self) -> JobOutcome {
        self.token.cancel();
        self.run()
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("name", &self.name)
            .field("seq", &self.seq)
            .field("canceled", &self.token.canceled())
            .finish()
    }
}

/// Best-effort extraction of a panic payload for logging.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}

/// Log a contained thunk panic. Workers survive these.
pub(crate) fn report_panic(name: Option<&str>, payload: &(dyn std::any::Any + Send)) {
    error!(
        job = name.unwrap_or("<unnamed>"),
        panic = %panic_message(payload),
        "job panicked; promise resolved as canceled"
    );
}
