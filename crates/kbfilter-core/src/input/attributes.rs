// Kbfilter Input Layer - Keyboard Attributes
// Capability descriptor returned by the attribute query and cached by the filter

/// Keyboard type and subtype identifier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyboardId {
    pub kind: u8,
    pub subtype: u8,
}

/// Typematic (auto-repeat) parameters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TypematicParameters {
    pub unit_id: u16,
    /// Characters per second
    pub rate: u16,
    /// Delay before repeat, in milliseconds
    pub delay: u16,
}

impl TypematicParameters {
    const SIZE: usize = 6;

    fn decode(bytes: &[u8]) -> Self {
        Self {
            unit_id: read_u16(bytes, 0),
            rate: read_u16(bytes, 2),
            delay: read_u16(bytes, 4),
        }
    }

    fn encode(&self, out: &mut [u8]) {
        out[0..2].copy_from_slice(&self.unit_id.to_le_bytes());
        out[2..4].copy_from_slice(&self.rate.to_le_bytes());
        out[4..6].copy_from_slice(&self.delay.to_le_bytes());
    }
}

/// Keyboard capability descriptor.
///
/// The wire form is 28 little-endian bytes:
///
/// | offset | field |
/// |---|---|
/// | 0 | id type (u8) |
/// | 1 | id subtype (u8) |
/// | 2 | keyboard mode (u16) |
/// | 4 | function keys (u16) |
/// | 6 | indicators (u16) |
/// | 8 | total keys (u16) |
/// | 10 | padding |
/// | 12 | input data queue length (u32) |
/// | 16 | minimum typematic |
/// | 22 | maximum typematic |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyboardAttributes {
    pub keyboard_identifier: KeyboardId,
    pub keyboard_mode: u16,
    pub number_of_function_keys: u16,
    pub number_of_indicators: u16,
    pub number_of_keys_total: u16,
    pub input_data_queue_length: u32,
    pub key_repeat_minimum: TypematicParameters,
    pub key_repeat_maximum: TypematicParameters,
}

impl KeyboardAttributes {
    /// Size of the descriptor on the wire
    pub const SIZE: usize = 28;

    /// Decode a descriptor from a response payload.
    ///
    /// Returns `None` when the payload is shorter than [`Self::SIZE`].
    /// Trailing bytes beyond the descriptor are ignored.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }

        Some(Self {
            keyboard_identifier: KeyboardId {
                kind: bytes[0],
                subtype: bytes[1],
            },
            keyboard_mode: read_u16(bytes, 2),
            number_of_function_keys: read_u16(bytes, 4),
            number_of_indicators: read_u16(bytes, 6),
            number_of_keys_total: read_u16(bytes, 8),
            input_data_queue_length: u32::from_le_bytes([
                bytes[12], bytes[13], bytes[14], bytes[15],
            ]),
            key_repeat_minimum: TypematicParameters::decode(&bytes[16..16 + TypematicParameters::SIZE]),
            key_repeat_maximum: TypematicParameters::decode(&bytes[22..22 + TypematicParameters::SIZE]),
        })
    }

    /// Encode the descriptor into its wire form
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[0] = self.keyboard_identifier.kind;
        out[1] = self.keyboard_identifier.subtype;
        out[2..4].copy_from_slice(&self.keyboard_mode.to_le_bytes());
        out[4..6].copy_from_slice(&self.number_of_function_keys.to_le_bytes());
        out[6..8].copy_from_slice(&self.number_of_indicators.to_le_bytes());
        out[8..10].copy_from_slice(&self.number_of_keys_total.to_le_bytes());
        out[12..16].copy_from_slice(&self.input_data_queue_length.to_le_bytes());
        self.key_repeat_minimum.encode(&mut out[16..22]);
        self.key_repeat_maximum.encode(&mut out[22..28]);
        out
    }

    /// Attributes of a standard 101/102-key enhanced keyboard
    pub fn enhanced_101() -> Self {
        Self {
            keyboard_identifier: KeyboardId { kind: 4, subtype: 0 },
            keyboard_mode: 1,
            number_of_function_keys: 12,
            number_of_indicators: 3,
            number_of_keys_total: 101,
            input_data_queue_length: 100,
            key_repeat_minimum: TypematicParameters {
                unit_id: 0,
                rate: 2,
                delay: 250,
            },
            key_repeat_maximum: TypematicParameters {
                unit_id: 0,
                rate: 30,
                delay: 1000,
            },
        }
    }
}

fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}
