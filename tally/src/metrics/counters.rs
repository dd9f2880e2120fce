use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-lifetime counters for operational visibility.
///
/// Read for monitoring only; nothing in the engine branches on them.
#[derive(Clone, Default)]
pub struct Counters {
    pub processed_jobs: Arc<AtomicU64>,
    /// Persistence failures plus queue-overflow drops.
    pub failed_jobs: Arc<AtomicU64>,

    // breakdown
    pub dropped_jobs: Arc<AtomicU64>,
    pub rejected_increments: Arc<AtomicU64>,
    pub flushes: Arc<AtomicU64>,
}

impl Counters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, queue_depth: usize) -> Diagnostics {
        Diagnostics {
            processed_jobs: self.processed_jobs.load(Ordering::Relaxed),
            failed_jobs: self.failed_jobs.load(Ordering::Relaxed),
            dropped_jobs: self.dropped_jobs.load(Ordering::Relaxed),
            rejected_increments: self.rejected_increments.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
            queue_depth,
        }
    }
}

/// Point-in-time copy of [`Counters`] plus the current queue depth.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub processed_jobs: u64,
    pub failed_jobs: u64,
    pub dropped_jobs: u64,
    pub rejected_increments: u64,
    pub flushes: u64,
    pub queue_depth: usize,
}
