// Kbfilter Statistics
// Lock-free counters updated on the event path

use std::sync::atomic::{AtomicU64, Ordering};

/// Running counters for one filter device
#[derive(Debug, Default)]
pub struct FilterStats {
    batches: AtomicU64,
    events: AtomicU64,
    suppressed: AtomicU64,
    fail_open: AtomicU64,
}

/// Point-in-time copy of [`FilterStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub batches: u64,
    pub events: u64,
    pub suppressed: u64,
    pub fail_open: u64,
}

impl FilterStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_batch(&self, events: usize) {
        self.batches.fetch_add(1, Ordering::Relaxed);
        self.events.fetch_add(events as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_suppressed(&self, count: usize) {
        self.suppressed.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_fail_open(&self) {
        self.fail_open.fetch_add(1, Ordering::Relaxed);
    }

    /// Read all counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            batches: self.batches.load(Ordering::Relaxed),
            events: self.events.load(Ordering::Relaxed),
            suppressed: self.suppressed.load(Ordering::Relaxed),
            fail_open: self.fail_open.load(Ordering::Relaxed),
        }
    }
}
