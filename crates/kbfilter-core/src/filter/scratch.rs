// Kbfilter Scratch Buffers
// Fallible allocation of the filtered copy of a batch

use smallvec::SmallVec;

use crate::input::KeyboardInputData;

/// Events held inline before a scratch batch spills to the heap
pub const SCRATCH_INLINE: usize = 16;

/// Filtered copy of a batch.
///
/// `origins[i]` is the index in the original batch of `events[i]`, so a
/// consumed count over the copy can be mapped back to original bounds.
#[derive(Debug, Default)]
pub struct ScratchBatch {
    pub events: SmallVec<[KeyboardInputData; SCRATCH_INLINE]>,
    pub origins: SmallVec<[usize; SCRATCH_INLINE]>,
}

impl ScratchBatch {
    /// Append a kept event and where it came from
    pub fn push(&mut self, origin: usize, event: KeyboardInputData) {
        self.events.push(event);
        self.origins.push(origin);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Provides scratch space for filtering.
///
/// Returning `None` means no buffer is available right now; the caller
/// must fall back to delivering the batch unfiltered.
pub trait ScratchAllocator: Send + Sync {
    /// Obtain a batch able to hold `capacity` events without reallocating
    fn try_scratch(&self, capacity: usize) -> Option<ScratchBatch>;
}

/// Heap-backed scratch using fallible reservation
#[derive(Debug, Clone, Copy, Default)]
pub struct HeapScratch;

impl ScratchAllocator for HeapScratch {
    fn try_scratch(&self, capacity: usize) -> Option<ScratchBatch> {
        let mut batch = ScratchBatch::default();
        batch.events.try_reserve_exact(capacity).ok()?;
        batch.origins.try_reserve_exact(capacity).ok()?;
        Some(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heap_scratch_small_batch_stays_inline() {
        let batch = HeapScratch.try_scratch(4).unwrap();
        assert!(batch.is_empty());
        assert!(!batch.events.spilled());
    }

    #[test]
    fn test_heap_scratch_reserves_requested_capacity() {
        let batch = HeapScratch.try_scratch(100).unwrap();
        assert!(batch.events.capacity() >= 100);
        assert!(batch.origins.capacity() >= 100);
    }

    #[test]
    fn test_scratch_push_tracks_origin() {
        let mut batch = ScratchBatch::default();
        batch.push(3, KeyboardInputData::press(0x1E));
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.origins[0], 3);
    }
}
