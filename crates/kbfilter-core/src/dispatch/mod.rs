// Kbfilter Request Dispatch
// Request model and the per-request-kind handling of internal device control

pub mod completion;
pub mod internal;

use std::fmt;

use crate::hook::{ConnectData, HookKeyboard};
use crate::status::Status;

pub use internal::Disposition;

/// Major function of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MajorFunction {
    Create,
    Close,
    DeviceControl,
    InternalDeviceControl,
    Power,
    Pnp,
    SystemControl,
}

/// Keyboard class and i8042 control codes this filter knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IoControlCode {
    KeyboardConnect,
    KeyboardDisconnect,
    I8042HookKeyboard,
    KeyboardQueryAttributes,
    KeyboardQueryIndicatorTranslation,
    KeyboardQueryIndicators,
    KeyboardSetIndicators,
    KeyboardQueryTypematic,
    KeyboardSetTypematic,
    Other(u32),
}

impl IoControlCode {
    const FILE_DEVICE_KEYBOARD: u32 = 0x0000_000B;
    const METHOD_BUFFERED: u32 = 0;
    const METHOD_NEITHER: u32 = 3;

    const fn ctl_code(function: u32, method: u32) -> u32 {
        (Self::FILE_DEVICE_KEYBOARD << 16) | (function << 2) | method
    }

    const CONNECT: u32 = Self::ctl_code(0x0080, Self::METHOD_NEITHER);
    const DISCONNECT: u32 = Self::ctl_code(0x0100, Self::METHOD_NEITHER);
    const HOOK_KEYBOARD: u32 = Self::ctl_code(0x0FF0, Self::METHOD_NEITHER);
    const QUERY_ATTRIBUTES: u32 = Self::ctl_code(0x0000, Self::METHOD_BUFFERED);
    const SET_TYPEMATIC: u32 = Self::ctl_code(0x0001, Self::METHOD_BUFFERED);
    const SET_INDICATORS: u32 = Self::ctl_code(0x0002, Self::METHOD_BUFFERED);
    const QUERY_TYPEMATIC: u32 = Self::ctl_code(0x0008, Self::METHOD_BUFFERED);
    const QUERY_INDICATORS: u32 = Self::ctl_code(0x0010, Self::METHOD_BUFFERED);
    const QUERY_INDICATOR_TRANSLATION: u32 = Self::ctl_code(0x0020, Self::METHOD_BUFFERED);

    /// Numeric control code
    pub fn raw(self) -> u32 {
        match self {
            IoControlCode::KeyboardConnect => Self::CONNECT,
            IoControlCode::KeyboardDisconnect => Self::DISCONNECT,
            IoControlCode::I8042HookKeyboard => Self::HOOK_KEYBOARD,
            IoControlCode::KeyboardQueryAttributes => Self::QUERY_ATTRIBUTES,
            IoControlCode::KeyboardQueryIndicatorTranslation => Self::QUERY_INDICATOR_TRANSLATION,
            IoControlCode::KeyboardQueryIndicators => Self::QUERY_INDICATORS,
            IoControlCode::KeyboardSetIndicators => Self::SET_INDICATORS,
            IoControlCode::KeyboardQueryTypematic => Self::QUERY_TYPEMATIC,
            IoControlCode::KeyboardSetTypematic => Self::SET_TYPEMATIC,
            IoControlCode::Other(raw) => raw,
        }
    }

    /// Classify a numeric control code
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            Self::CONNECT => IoControlCode::KeyboardConnect,
            Self::DISCONNECT => IoControlCode::KeyboardDisconnect,
            Self::HOOK_KEYBOARD => IoControlCode::I8042HookKeyboard,
            Self::QUERY_ATTRIBUTES => IoControlCode::KeyboardQueryAttributes,
            Self::QUERY_INDICATOR_TRANSLATION => IoControlCode::KeyboardQueryIndicatorTranslation,
            Self::QUERY_INDICATORS => IoControlCode::KeyboardQueryIndicators,
            Self::SET_INDICATORS => IoControlCode::KeyboardSetIndicators,
            Self::QUERY_TYPEMATIC => IoControlCode::KeyboardQueryTypematic,
            Self::SET_TYPEMATIC => IoControlCode::KeyboardSetTypematic,
            other => IoControlCode::Other(other),
        }
    }
}

impl fmt::Display for IoControlCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({:#010x})", self, self.raw())
    }
}

/// Input payload of a request
#[derive(Debug, Clone, Default)]
pub enum RequestInput {
    #[default]
    None,
    Connect(ConnectData),
    HookKeyboard(HookKeyboard),
    /// Opaque bytes passed through to the lower driver
    Bytes(Vec<u8>),
}

impl RequestInput {
    /// Length of the payload as the sender would declare it
    pub fn wire_len(&self) -> usize {
        match self {
            RequestInput::None => 0,
            RequestInput::Connect(_) => ConnectData::WIRE_SIZE,
            RequestInput::HookKeyboard(_) => HookKeyboard::WIRE_SIZE,
            RequestInput::Bytes(bytes) => bytes.len(),
        }
    }
}

/// Final status and transferred byte count of a request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IoStatus {
    pub status: Status,
    pub information: usize,
}

/// One request travelling down the device stack
#[derive(Debug, Clone)]
pub struct Request {
    pub major: MajorFunction,
    pub control_code: Option<IoControlCode>,
    pub input: RequestInput,
    /// Declared input length; may disagree with the payload
    pub input_length: usize,
    /// Response buffer filled by the lower driver
    pub output: Vec<u8>,
    pub output_length: usize,
    pub io_status: IoStatus,
}

impl Request {
    /// A request with no control code (create, close, power, ...)
    pub fn new(major: MajorFunction) -> Self {
        Self {
            major,
            control_code: None,
            input: RequestInput::None,
            input_length: 0,
            output: Vec::new(),
            output_length: 0,
            io_status: IoStatus::default(),
        }
    }

    /// An internal device control request with its payload
    pub fn internal(code: IoControlCode, input: RequestInput) -> Self {
        let input_length = input.wire_len();
        Self {
            control_code: Some(code),
            input,
            input_length,
            ..Self::new(MajorFunction::InternalDeviceControl)
        }
    }

    /// Keyboard connect request
    pub fn connect(data: ConnectData) -> Self {
        Self::internal(IoControlCode::KeyboardConnect, RequestInput::Connect(data))
    }

    /// i8042 hook request
    pub fn hook_keyboard(hook: HookKeyboard) -> Self {
        Self::internal(IoControlCode::I8042HookKeyboard, RequestInput::HookKeyboard(hook))
    }

    /// Attribute query with room for `output_length` response bytes
    pub fn query_attributes(output_length: usize) -> Self {
        Self::internal(IoControlCode::KeyboardQueryAttributes, RequestInput::None)
            .with_output_length(output_length)
    }

    /// Override the declared input length
    pub fn with_input_length(mut self, input_length: usize) -> Self {
        self.input_length = input_length;
        self
    }

    /// Set the response buffer size
    pub fn with_output_length(mut self, output_length: usize) -> Self {
        self.output_length = output_length;
        self
    }

    /// Complete the request at this layer
    pub fn complete(&mut self, status: Status, information: usize) {
        self.io_status = IoStatus { status, information };
    }

    /// Connect payload after dispatch, if any
    pub fn connect_data(&self) -> Option<&ConnectData> {
        match &self.input {
            RequestInput::Connect(data) => Some(data),
            _ => None,
        }
    }

    /// Hook payload after dispatch, if any
    pub fn hook_data(&self) -> Option<&HookKeyboard> {
        match &self.input {
            RequestInput::HookKeyboard(hook) => Some(hook),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_control_codes() {
        assert_eq!(IoControlCode::KeyboardConnect.raw(), 0x000B_0203);
        assert_eq!(IoControlCode::KeyboardDisconnect.raw(), 0x000B_0403);
        assert_eq!(IoControlCode::I8042HookKeyboard.raw(), 0x000B_3FC3);
        assert_eq!(IoControlCode::KeyboardQueryAttributes.raw(), 0x000B_0000);
        assert_eq!(IoControlCode::KeyboardSetIndicators.raw(), 0x000B_0008);
    }

    #[test]
    fn test_unknown_code_is_other() {
        assert_eq!(IoControlCode::from_raw(0x0022_0000), IoControlCode::Other(0x0022_0000));
        assert_eq!(
            IoControlCode::from_raw(IoControlCode::KeyboardQueryTypematic.raw()),
            IoControlCode::KeyboardQueryTypematic
        );
    }

    #[test]
    fn test_internal_request_declares_payload_length() {
        let request = Request::connect(ConnectData::default());
        assert_eq!(request.input_length, ConnectData::WIRE_SIZE);
        assert_eq!(request.major, MajorFunction::InternalDeviceControl);

        let short = Request::hook_keyboard(HookKeyboard::default()).with_input_length(8);
        assert_eq!(short.input_length, 8);
    }

    #[test]
    fn test_complete_sets_io_status() {
        let mut request = Request::new(MajorFunction::Create);
        request.complete(Status::NotImplemented, 0);
        assert_eq!(request.io_status.status, Status::NotImplemented);
        assert_eq!(request.io_status.information, 0);
    }
}
