use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Something that can report being canceled.
///
/// Implemented by [`CancelToken`] and by [`Future`], so a wait can be gated
/// either on an explicit token or on the fate of an upstream job.
///
/// [`Future`]: crate::future::Future
pub trait Cancelable {
    fn canceled(&self) -> bool;
}

/// Shared, monotonic cancellation flag.
///
/// A token is shared between a job's future and the worker that executes the
/// job. Cancellation is advisory: setting the flag never interrupts a running
/// job. Workers check it once before invoking the job's closure; long-running
/// closures receive a reference and are expected to poll it at convenient
/// points.
///
/// Once set, the flag never clears.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Release ordering so that writes made before the
    /// request are visible to an observer that sees the flag set.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn canceled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

impl Cancelable for CancelToken {
    fn canceled(&self) -> bool {
        CancelToken::canceled(self)
    }
}
