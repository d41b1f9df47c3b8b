// Kbfilter Filtering
// Duplicate press suppression for delivered input batches

pub mod dedup;
mod scratch;
mod stats;

pub use dedup::{DedupEngine, FilterOutcome, UnfilteredReason, DEFAULT_THRESHOLD};
pub use scratch::{HeapScratch, ScratchAllocator, ScratchBatch, SCRATCH_INLINE};
pub use stats::{FilterStats, StatsSnapshot};
