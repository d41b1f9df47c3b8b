// Kbfilter Deduplication Engine
// Drops repeated presses of the same key that arrive inside the window
//
// A glitching key shows up as a burst of make codes for the same scan
// code. Only presses are tracked; releases always pass and are never
// recorded.

use std::sync::Arc;
use std::time::Duration;

use crate::clock::Clock;
use crate::filter::scratch::{ScratchAllocator, ScratchBatch};
use crate::input::KeyboardInputData;
use crate::state::RecentKeyRing;

/// Presses of the same code closer together than this are duplicates
pub const DEFAULT_THRESHOLD: Duration = Duration::from_millis(300);

/// Why a batch was delivered without filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnfilteredReason {
    /// No scratch buffer could be obtained (fail-open)
    ScratchUnavailable,
    /// Filtering is switched off in the settings
    Disabled,
}

/// Result of running one batch through the engine
#[derive(Debug)]
pub enum FilterOutcome {
    /// Deliver the original batch untouched
    Unfiltered(UnfilteredReason),
    /// Deliver the kept events, in original order
    Filtered(ScratchBatch),
}

impl FilterOutcome {
    /// Number of events removed from a batch of `original_len`
    pub fn suppressed(&self, original_len: usize) -> usize {
        match self {
            FilterOutcome::Unfiltered(_) => 0,
            FilterOutcome::Filtered(batch) => original_len - batch.len(),
        }
    }
}

/// Duplicate press filter for one device
pub struct DedupEngine {
    ring: RecentKeyRing,
    threshold: Duration,
    enabled: bool,
    clock: Arc<dyn Clock>,
    scratch: Arc<dyn ScratchAllocator>,
}

impl std::fmt::Debug for DedupEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DedupEngine")
            .field("ring", &self.ring)
            .field("threshold", &self.threshold)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

impl DedupEngine {
    /// Create an engine with an empty ring
    pub fn new(
        threshold: Duration,
        enabled: bool,
        clock: Arc<dyn Clock>,
        scratch: Arc<dyn ScratchAllocator>,
    ) -> Self {
        Self {
            ring: RecentKeyRing::new(),
            threshold,
            enabled,
            clock,
            scratch,
        }
    }

    /// Suppression window
    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Whether filtering is active
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The recent press ring
    pub fn ring(&self) -> &RecentKeyRing {
        &self.ring
    }

    /// Filter one batch.
    ///
    /// Presses of a code seen less than `threshold` ago are dropped. Kept
    /// presses are recorded with the time they were examined. If scratch
    /// space is unavailable the whole batch is passed through and the ring
    /// is left untouched.
    pub fn filter(&self, input: &[KeyboardInputData]) -> FilterOutcome {
        if !self.enabled {
            return FilterOutcome::Unfiltered(UnfilteredReason::Disabled);
        }

        let Some(mut kept) = self.scratch.try_scratch(input.len()) else {
            log::warn!(
                "scratch buffer unavailable, passing {} events through unfiltered",
                input.len()
            );
            return FilterOutcome::Unfiltered(UnfilteredReason::ScratchUnavailable);
        };

        for (index, event) in input.iter().enumerate() {
            log::trace!(
                "kbfilter: make code {:#04x} flags {:#x}",
                event.make_code,
                event.flags
            );

            if event.is_release() {
                kept.push(index, *event);
                continue;
            }

            let now = self.clock.now();
            if let Some(age) = self.ring.lookup(event.make_code, now) {
                if age < self.threshold {
                    log::debug!(
                        "filtered duplicate key {:#04x} (time diff: {}ms)",
                        event.make_code,
                        age.as_millis()
                    );
                    continue;
                }
            }

            kept.push(index, *event);
            self.ring.record(event.make_code, event.flags, now);
        }

        if kept.len() != input.len() {
            log::debug!(
                "filtered {} duplicate keys out of {} total",
                input.len() - kept.len(),
                input.len()
            );
        }

        FilterOutcome::Filtered(kept)
    }
}

/// Map a consumed count over a filtered copy back to the original batch.
///
/// Everything before the first unconsumed kept event is accounted for,
/// including suppressed events in between. When the consumer took every
/// kept event the whole original batch is accounted for.
pub fn consumed_in_original(batch: &ScratchBatch, consumed: usize, original_len: usize) -> usize {
    if consumed == 0 {
        0
    } else if consumed >= batch.len() {
        original_len
    } else {
        batch.origins[consumed]
    }
}
