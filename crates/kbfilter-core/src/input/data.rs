// Kbfilter Input Layer - Input Records
// The per-transition record delivered in batches by the port driver

/// Flag value of a key press (make code)
pub const KEY_MAKE: u16 = 0x00;

/// Flag bit set on a key release (break code)
pub const KEY_BREAK: u16 = 0x01;

/// Flag bit set when the scan code carried an E0 prefix
pub const KEY_E0: u16 = 0x02;

/// Flag bit set when the scan code carried an E1 prefix
pub const KEY_E1: u16 = 0x04;

/// Check if a flags word describes a key release.
pub fn is_key_release(flags: u16) -> bool {
    flags & KEY_BREAK != 0
}

/// One keyboard transition as reported by the port driver.
///
/// Mirrors the layout of the keyboard class input record: a unit id,
/// the scan (make) code, transition flags, and two reserved/extra words.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct KeyboardInputData {
    /// Unit number of the keyboard that produced the event
    pub unit_id: u16,
    /// Scan code of the key
    pub make_code: u16,
    /// Transition flags (`KEY_BREAK`, `KEY_E0`, `KEY_E1`)
    pub flags: u16,
    pub reserved: u16,
    /// Device-specific extra information
    pub extra_information: u32,
}

impl KeyboardInputData {
    /// Create a key press for the given scan code
    pub fn press(make_code: u16) -> Self {
        Self {
            make_code,
            flags: KEY_MAKE,
            ..Self::default()
        }
    }

    /// Create a key release for the given scan code
    pub fn release(make_code: u16) -> Self {
        Self {
            make_code,
            flags: KEY_BREAK,
            ..Self::default()
        }
    }

    /// Add extra flag bits (for example `KEY_E0`)
    pub fn with_flags(mut self, flags: u16) -> Self {
        self.flags |= flags;
        self
    }

    /// Set the unit id
    pub fn with_unit(mut self, unit_id: u16) -> Self {
        self.unit_id = unit_id;
        self
    }

    /// True for a break (release) transition
    pub fn is_release(&self) -> bool {
        is_key_release(self.flags)
    }

    /// True for a make (press) transition
    pub fn is_press(&self) -> bool {
        !self.is_release()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_press_has_no_break_flag() {
        let event = KeyboardInputData::press(0x1E);
        assert!(event.is_press());
        assert!(!event.is_release());
        assert_eq!(event.flags, KEY_MAKE);
    }

    #[test]
    fn test_release_sets_break_flag() {
        let event = KeyboardInputData::release(0x1E);
        assert!(event.is_release());
        assert_eq!(event.make_code, 0x1E);
    }

    #[test]
    fn test_extended_release_is_release() {
        // Right Ctrl release: E0 1D with the break bit
        let event = KeyboardInputData::release(0x1D).with_flags(KEY_E0);
        assert!(event.is_release());
        assert_eq!(event.flags, KEY_BREAK | KEY_E0);
    }

    #[test]
    fn test_extended_press_is_press() {
        let event = KeyboardInputData::press(0x48).with_flags(KEY_E0);
        assert!(event.is_press());
    }

    #[test]
    fn test_builders_compose() {
        let event = KeyboardInputData::release(0x38).with_flags(KEY_E0).with_unit(1);
        assert_eq!(event.unit_id, 1);
        assert_eq!(event.make_code, 0x38);
        assert!(event.is_release());
        assert_eq!(KeyboardInputData::press(0x38).unit_id, 0);
    }

    #[test]
    fn test_is_key_release_flag_word() {
        assert!(is_key_release(KEY_BREAK));
        assert!(is_key_release(KEY_BREAK | KEY_E1));
        assert!(!is_key_release(KEY_E0));
        assert!(!is_key_release(KEY_MAKE));
    }
}
