// Kbfilter Internal Device Control
// Decides, per control code, whether to reject, intercept, or pass through

use std::sync::Arc;

use crate::device::FilterState;
use crate::dispatch::{IoControlCode, Request, RequestInput};
use crate::hook::{ConnectData, HookKeyboard, OpaqueContext, ServiceCallback};
use crate::status::Status;

/// What to do with a request after this layer has looked at it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Finish here with this status; never forwarded
    Complete(Status),
    /// Send down the stack unchanged
    Forward,
    /// Send down and capture the response when it completes
    ForwardWithCapture,
}

/// Handle one internal device control request.
///
/// Each request is judged on its own; there is no session state beyond
/// what connect and hook installation record.
pub(crate) fn handle(state: &Arc<FilterState>, request: &mut Request) -> Disposition {
    let Some(code) = request.control_code else {
        return Disposition::Forward;
    };

    log::debug!("internal device control {}", code);

    match code {
        IoControlCode::KeyboardConnect => match connect(state, request) {
            Ok(()) => Disposition::Forward,
            Err(status) => Disposition::Complete(status),
        },

        // Clearing the recorded consumer is not supported
        IoControlCode::KeyboardDisconnect => Disposition::Complete(Status::NotImplemented),

        IoControlCode::I8042HookKeyboard => {
            log::debug!("hook keyboard received");
            match hook_keyboard(state, request) {
                Ok(()) => Disposition::Forward,
                Err(status) => Disposition::Complete(status),
            }
        }

        IoControlCode::KeyboardQueryAttributes => Disposition::ForwardWithCapture,

        IoControlCode::KeyboardQueryIndicatorTranslation
        | IoControlCode::KeyboardQueryIndicators
        | IoControlCode::KeyboardSetIndicators
        | IoControlCode::KeyboardQueryTypematic
        | IoControlCode::KeyboardSetTypematic
        | IoControlCode::Other(_) => Disposition::Forward,
    }
}

fn connect(state: &Arc<FilterState>, request: &mut Request) -> Result<(), Status> {
    let chain = state.chain();
    if chain.is_connected() {
        return Err(Status::SharingViolation);
    }
    if request.input_length < ConnectData::WIRE_SIZE {
        return Err(Status::InvalidParameter);
    }
    let RequestInput::Connect(data) = &mut request.input else {
        return Err(Status::InvalidParameter);
    };

    let entry: Arc<dyn ServiceCallback> = state.clone();
    let entry_context: OpaqueContext = state.clone();
    chain.connect(data, Some(entry_context), entry)
}

fn hook_keyboard(state: &Arc<FilterState>, request: &mut Request) -> Result<(), Status> {
    if request.input_length < HookKeyboard::WIRE_SIZE {
        return Err(Status::InvalidParameter);
    }
    let RequestInput::HookKeyboard(hook) = &mut request.input else {
        return Err(Status::InvalidParameter);
    };

    state.chain().install(hook);
    Ok(())
}
