//! Single-shot result channel between a producing job and any number of
//! consumers, with continuation chaining.
//!
//! A [`Promise`] is the producer handle, a [`Future`] the consumer handle.
//! Both are cheap clones over the same shared slot. The slot resolves exactly
//! once, either with a value or as canceled; later resolutions are no-ops.
//!
//! This is a blocking primitive for thread-pool jobs. It is unrelated to
//! `std::future::Future` and never suspends; `join` parks the calling thread
//! on a condition variable.

use crate::cancel::{CancelToken, Cancelable};
use crate::pool::JobPool;
use parking_lot::{Condvar, Mutex};
use smallvec::SmallVec;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

mod chain;
pub use chain::Continuation;

/// Callback registered on a slot, fired exactly once at resolution. Receives
/// the resolution and the resolving job's origin pool so a continuation can
/// follow its antecedent.
pub(crate) type BoxedContinuation<T> =
    Box<dyn FnOnce(Resolution<T>, Option<Arc<JobPool>>) + Send>;

/// Outcome delivered to continuations.
pub(crate) enum Resolution<T> {
    Value(T),
    Canceled,
}

enum Slot<T> {
    /// Not yet resolved; holds continuations to fire on resolution. Almost
    /// always zero or one entries, hence the inline capacity.
    Pending(SmallVec<[BoxedContinuation<T>; 1]>),
    Resolved(T),
    Canceled,
}

pub(crate) struct Shared<T> {
    slot: Mutex<Slot<T>>,
    resolved: Condvar,
    token: CancelToken,
    /// Live `Future` handles. When the last one drops while the slot is
    /// pending and the dispatch allowed it, the token is set (abandon).
    consumers: AtomicUsize,
    /// Live `Promise` handles. When the last one drops while the slot is
    /// pending, the slot resolves canceled so joiners are not stranded.
    producers: AtomicUsize,
    can_cancel: AtomicBool,
    /// Pool the producing job was dispatched into; continuations follow it
    /// unless their context overrides the pool.
    origin: OnceLock<Arc<JobPool>>,
}

impl<T> Shared<T> {
    fn new() -> Self {
        Self {
            slot: Mutex::new(Slot::Pending(SmallVec::new())),
            resolved: Condvar::new(),
            token: CancelToken::new(),
            consumers: AtomicUsize::new(0),
            producers: AtomicUsize::new(1),
            can_cancel: AtomicBool::new(true),
            origin: OnceLock::new(),
        }
    }

    fn is_pending(&self) -> bool {
        matches!(&*self.slot.lock(), Slot::Pending(_))
    }

    /// Resolve as canceled: set the token, publish, fire continuations.
    /// No-op if already resolved, including the token, so a late cancel
    /// cannot make a value-resolved future read as canceled.
    fn resolve_canceled(&self) {
        let pending = {
            let mut slot = self.slot.lock();
            match &mut *slot {
                Slot::Pending(conts) => {
                    // Set before publication so an observer of the canceled
                    // slot also sees the flag.
                    self.token.cancel();
                    let conts = std::mem::take(conts);
                    *slot = Slot::Canceled;
                    self.resolved.notify_all();
                    Some(conts)
                }
                _ => None,
            }
        };
        if let Some(conts) = pending {
            let origin = self.origin.get().cloned();
            for cont in conts {
                cont(Resolution::Canceled, origin.clone());
            }
        }
    }
}

impl<T: Clone> Shared<T> {
    /// Publish a value. First writer wins; the value is cloned once per
    /// registered continuation, outside the slot lock.
    fn resolve_value(&self, value: T) {
        let pending = {
            let mut slot = self.slot.lock();
            match &mut *slot {
                Slot::Pending(conts) => {
                    let conts = std::mem::take(conts);
                    *slot = Slot::Resolved(value.clone());
                    self.resolved.notify_all();
                    Some(conts)
                }
                _ => None,
            }
        };
        if let Some(conts) = pending {
            let origin = self.origin.get().cloned();
            for cont in conts {
                cont(Resolution::Value(value.clone()), origin.clone());
            }
        }
    }

    /// Attach a continuation, firing it immediately if the slot already
    /// resolved. Immediate firing happens outside the slot lock.
    pub(crate) fn register(&self, cont: BoxedContinuation<T>) {
        let immediate = {
            let mut slot = self.slot.lock();
            match &mut *slot {
                Slot::Pending(conts) => {
                    conts.push(cont);
                    return;
                }
                Slot::Resolved(value) => Resolution::Value(value.clone()),
                Slot::Canceled => Resolution::Canceled,
            }
        };
        cont(immediate, self.origin.get().cloned());
    }
}

/// Producer handle: write-once result slot for a job.
///
/// Created implicitly at dispatch for result-producing jobs, or explicitly
/// for user-driven resolution. Clones share the slot; the first `resolve` or
/// `cancel` wins and later calls are no-ops.
///
/// If every producer handle drops while the slot is still pending, the slot
/// resolves canceled so waiting consumers are released.
///
/// ```
/// use jobline::Promise;
///
/// let promise = Promise::new();
/// let future = promise.future();
/// promise.resolve(7);
/// assert_eq!(future.join(), 7);
/// ```
pub struct Promise<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Default for Promise<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Promise<T> {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared::new()),
        }
    }

    /// A new consumer handle on this slot.
    pub fn future(&self) -> Future<T> {
        self.shared.consumers.fetch_add(1, Ordering::AcqRel);
        Future {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Resolve as canceled. Consumers see `canceled() == true` and `join`
    /// returns the default value.
    pub fn cancel(&self) {
        self.shared.resolve_canceled();
    }

    pub(crate) fn token(&self) -> &CancelToken {
        &self.shared.token
    }

    pub(crate) fn set_can_cancel(&self, yes: bool) {
        self.shared.can_cancel.store(yes, Ordering::Release);
    }

    pub(crate) fn set_origin(&self, pool: &Arc<JobPool>) {
        let _ = self.shared.origin.set(Arc::clone(pool));
    }
}

impl<T: Clone> Promise<T> {
    /// Fulfill the promise. First writer wins; this never panics on a
    /// repeated resolve.
    pub fn resolve(&self, value: T) {
        self.shared.resolve_value(value);
    }
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        self.shared.producers.fetch_add(1, Ordering::AcqRel);
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Drop for Promise<T> {
    fn drop(&mut self) {
        if self.shared.producers.fetch_sub(1, Ordering::AcqRel) == 1
            && self.shared.is_pending()
        {
            // Nobody can fulfill this slot anymore.
            self.shared.resolve_canceled();
        }
    }
}

impl<T> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("pending", &self.shared.is_pending())
            .finish()
    }
}

/// Consumer handle: read side of a job's result slot.
///
/// Futures are cheap clones; every clone observes the same single resolution.
/// Dropping the last clone of a pending future whose dispatch allowed
/// cancellation sets the job's token (abandon), which is how fire-and-wait
/// call sites cancel work they stopped caring about.
pub struct Future<T> {
    pub(crate) shared: Arc<Shared<T>>,
}

impl<T> Future<T> {
    /// Whether a resolution of either kind has been published. Never blocks.
    pub fn available(&self) -> bool {
        !self.shared.is_pending()
    }

    /// Whether the producer was canceled (including abandonment and contained
    /// panics). Never blocks.
    pub fn canceled(&self) -> bool {
        self.shared.token.canceled()
    }

    /// Request cancellation of the producing job. Advisory; a job that is
    /// already running only notices if it polls its token.
    pub fn cancel(&self) {
        self.shared.token.cancel();
    }
}

impl<T: Clone + Default> Future<T> {
    /// Block until resolution and return the value.
    ///
    /// Returns immediately if the slot already resolved. If the producer was
    /// canceled the returned value is `T::default()`; check
    /// [`canceled`](Self::canceled) to tell the cases apart. Repeated joins
    /// return clones of the same stored value.
    pub fn join(&self) -> T {
        let mut slot = self.shared.slot.lock();
        loop {
            match &*slot {
                Slot::Resolved(value) => return value.clone(),
                Slot::Canceled => return T::default(),
                Slot::Pending(_) => self.shared.resolved.wait(&mut slot),
            }
        }
    }

    /// Block until resolution or until `cancel` reports canceled, whichever
    /// comes first.
    pub fn join_cancelable(&self, cancel: &impl Cancelable) -> T {
        const POLL: std::time::Duration = std::time::Duration::from_millis(100);
        let mut slot = self.shared.slot.lock();
        loop {
            match &*slot {
                Slot::Resolved(value) => return value.clone(),
                Slot::Canceled => return T::default(),
                Slot::Pending(_) => {
                    if cancel.canceled() {
                        return T::default();
                    }
                    self.shared.resolved.wait_for(&mut slot, POLL);
                }
            }
        }
    }
}

impl<T> Clone for Future<T> {
    fn clone(&self) -> Self {
        self.shared.consumers.fetch_add(1, Ordering::AcqRel);
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Drop for Future<T> {
    fn drop(&mut self) {
        if self.shared.consumers.fetch_sub(1, Ordering::AcqRel) == 1
            && self.shared.can_cancel.load(Ordering::Acquire)
            && self.shared.is_pending()
        {
            // Abandoned: flag the job, do not resolve. The job still owns the
            // slot and publishes the canceled resolution when it is reached.
            self.shared.token.cancel();
        }
    }
}

impl<T> Cancelable for Future<T> {
    fn canceled(&self) -> bool {
        Future::canceled(self)
    }
}

impl<T> fmt::Debug for Future<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Future")
            .field("available", &self.available())
            .field("canceled", &self.canceled())
            .finish()
    }
}
