// Kbfilter Recent Key Ring
// Fixed-capacity circular record of recent key presses

use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Number of slots in the ring
pub const RECENT_KEY_CAPACITY: usize = 16;

/// One recorded press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecentKey {
    pub make_code: u16,
    pub flags: u16,
    pub timestamp: Instant,
}

impl RecentKey {
    /// A slot holding make code 0 never matches
    fn is_empty(&self) -> bool {
        self.make_code == 0
    }
}

#[derive(Debug)]
struct Slots {
    keys: [Option<RecentKey>; RECENT_KEY_CAPACITY],
    next_index: usize,
}

/// Ring of the most recent key presses.
///
/// Insertion always overwrites the slot at the cursor, so the ring never
/// grows and the oldest entry is silently evicted. The lock is held only
/// for the fixed-size scan or the single-slot write; nothing inside the
/// critical section allocates.
#[derive(Debug)]
pub struct RecentKeyRing {
    slots: Mutex<Slots>,
}

impl Default for RecentKeyRing {
    fn default() -> Self {
        Self::new()
    }
}

impl RecentKeyRing {
    /// Create an empty ring
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(Slots {
                keys: [None; RECENT_KEY_CAPACITY],
                next_index: 0,
            }),
        }
    }

    /// Record a press at `now`, overwriting the oldest slot
    pub fn record(&self, make_code: u16, flags: u16, now: Instant) {
        let mut slots = self.slots.lock();
        let index = slots.next_index;
        slots.keys[index] = Some(RecentKey {
            make_code,
            flags,
            timestamp: now,
        });
        slots.next_index = (index + 1) % RECENT_KEY_CAPACITY;
    }

    /// Time since the most recent recorded press of `make_code`.
    ///
    /// Empty slots and slots holding code 0 are skipped. A timestamp later
    /// than `now` counts as zero elapsed time.
    pub fn lookup(&self, make_code: u16, now: Instant) -> Option<Duration> {
        let slots = self.slots.lock();
        slots
            .keys
            .iter()
            .flatten()
            .filter(|key| !key.is_empty() && key.make_code == make_code)
            .map(|key| now.saturating_duration_since(key.timestamp))
            .min()
    }

    /// Number of non-empty slots
    pub fn occupied(&self) -> usize {
        let slots = self.slots.lock();
        slots.keys.iter().flatten().filter(|key| !key.is_empty()).count()
    }

    /// Index of the slot the next insertion overwrites
    pub fn next_index(&self) -> usize {
        self.slots.lock().next_index
    }
}
