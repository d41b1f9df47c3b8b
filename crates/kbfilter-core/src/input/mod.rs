// Kbfilter Input Layer
// Keyboard input records and the capability descriptor reported by the port

mod attributes;
mod data;

pub use attributes::{KeyboardAttributes, KeyboardId, TypematicParameters};
pub use data::{is_key_release, KeyboardInputData, KEY_BREAK, KEY_E0, KEY_E1, KEY_MAKE};
