// Kbfilter Core Library
// Keyboard filter layer: hook chaining, request dispatch, duplicate press suppression

pub mod clock;
pub mod device;
pub mod dispatch;
pub mod filter;
pub mod hook;
pub mod input;
pub mod replay;
pub mod settings;
pub mod state;
pub mod status;

pub use clock::{Clock, ManualClock, SystemClock};
pub use device::{FilterDevice, FilterOptions, FilterState, LowerDevice};
pub use dispatch::{IoControlCode, IoStatus, MajorFunction, Request, RequestInput};
pub use filter::{
    DedupEngine, FilterOutcome, HeapScratch, ScratchAllocator, ScratchBatch, StatsSnapshot,
    UnfilteredReason,
};
pub use hook::{
    ConnectData, HookChain, HookKeyboard, InitializationHook, IsrHook, IsrWritePort,
    OpaqueContext, OutputPacket, QueueKeyboardPacket, ScanState, ServiceCallback, SynchPort,
};
pub use input::{KeyboardAttributes, KeyboardInputData, KEY_BREAK, KEY_E0, KEY_E1, KEY_MAKE};
pub use settings::{FilterSettings, SettingsError};
pub use state::{RecentKeyRing, RECENT_KEY_CAPACITY};
pub use status::Status;
