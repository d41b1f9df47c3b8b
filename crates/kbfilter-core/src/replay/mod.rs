// Kbfilter Replay
// Recorded keystroke traces and a simulated stack to play them through

mod stack;
mod trace;

pub use stack::{RecordingClass, SimulatedPort};
pub use trace::{load_trace, parse_trace, TraceBatch, TraceError};
