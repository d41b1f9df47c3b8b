// Kbfilter State
// Per-device bookkeeping shared by the event and control paths

mod recent;

pub use recent::{RecentKey, RecentKeyRing, RECENT_KEY_CAPACITY};
