// Kbfilter Clock
// Monotonic time source used to timestamp key presses

use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Source of monotonic timestamps
pub trait Clock: Send + Sync {
    /// Current monotonic time
    fn now(&self) -> Instant;
}

/// Clock backed by `std::time::Instant`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
///
/// Used by tests and by trace replay, where recorded timestamps drive time.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: Mutex<Duration>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    /// Create a clock frozen at its origin
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }

    /// Jump to an absolute offset from the origin.
    ///
    /// Offsets earlier than the current one are ignored; the clock never
    /// runs backwards.
    pub fn set_elapsed(&self, elapsed: Duration) {
        let mut offset = self.offset.lock();
        if elapsed > *offset {
            *offset = elapsed;
        }
    }

    /// Time elapsed since the origin
    pub fn elapsed(&self) -> Duration {
        *self.offset.lock()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.offset.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_starts_frozen() {
        let clock = ManualClock::new();
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_manual_clock_advance() {
        let clock = ManualClock::new();
        let start = clock.now();
        clock.advance(Duration::from_millis(150));
        assert_eq!(clock.now() - start, Duration::from_millis(150));
    }

    #[test]
    fn test_manual_clock_never_runs_backwards() {
        let clock = ManualClock::new();
        clock.set_elapsed(Duration::from_millis(500));
        clock.set_elapsed(Duration::from_millis(100));
        assert_eq!(clock.elapsed(), Duration::from_millis(500));
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
