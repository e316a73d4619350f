use crate::registry;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Live counters for one pool. All reads are relaxed snapshots; values from
/// different counters are not mutually consistent.
#[derive(Debug, Default)]
pub struct Metrics {
    pub(super) concurrency: AtomicUsize,
    pub(super) pending: AtomicUsize,
    pub(super) running: AtomicUsize,
    pub(super) canceled: AtomicUsize,
    pub(super) total: AtomicUsize,
}

impl Metrics {
    /// Worker threads currently alive.
    pub fn concurrency(&self) -> usize {
        self.concurrency.load(Ordering::Acquire)
    }

    /// Jobs queued but not yet started.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Relaxed)
    }

    /// Jobs currently executing on a worker.
    pub fn running(&self) -> usize {
        self.running.load(Ordering::Relaxed)
    }

    /// Jobs that ended canceled, including discards and contained panics.
    pub fn canceled(&self) -> usize {
        self.canceled.load(Ordering::Relaxed)
    }

    /// Jobs ever accepted by the pool.
    pub fn total(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }
}

/// Queued-but-not-started jobs across every registered pool.
pub fn total_pending() -> usize {
    registry::pools().iter().map(|p| p.metrics().pending()).sum()
}

/// Currently executing jobs across every registered pool.
pub fn total_running() -> usize {
    registry::pools().iter().map(|p| p.metrics().running()).sum()
}

/// Canceled jobs across every registered pool.
pub fn total_canceled() -> usize {
    registry::pools()
        .iter()
        .map(|p| p.metrics().canceled())
        .sum()
}
