// Kbfilter Replay - Simulated Stack
// A stand-in port driver below the filter and a recording class consumer above it

use std::sync::Arc;

use parking_lot::Mutex;

use crate::device::LowerDevice;
use crate::dispatch::{IoControlCode, MajorFunction, Request, RequestInput};
use crate::hook::{
    ConnectData, HookKeyboard, IsrWritePort, OpaqueContext, OutputPacket, QueueKeyboardPacket,
    ScanState, ServiceCallback, SynchPort,
};
use crate::input::{KeyboardAttributes, KeyboardInputData};
use crate::status::Status;

/// STATUS_BUFFER_TOO_SMALL
const BUFFER_TOO_SMALL: Status = Status::Other(0xC000_0023);

/// Port driver at the bottom of a simulated keyboard stack.
///
/// Completes every request it receives, answers attribute queries, and keeps
/// the connect and hook payloads that reach it so it can later deliver
/// batches and run the initialization and ISR hooks the way the real port
/// driver would.
pub struct SimulatedPort {
    attributes: KeyboardAttributes,
    attribute_status: Mutex<Status>,
    connect: Mutex<Option<ConnectData>>,
    hooks: Mutex<Option<HookKeyboard>>,
    requests: Mutex<Vec<(MajorFunction, Option<IoControlCode>)>>,
    port_writes: Mutex<Vec<u8>>,
    queued_packets: Mutex<usize>,
}

impl SimulatedPort {
    pub fn new(attributes: KeyboardAttributes) -> Self {
        Self {
            attributes,
            attribute_status: Mutex::new(Status::Success),
            connect: Mutex::new(None),
            hooks: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
            port_writes: Mutex::new(Vec::new()),
            queued_packets: Mutex::new(0),
        }
    }

    /// Make subsequent attribute queries fail with `status`
    pub fn fail_attribute_queries(&self, status: Status) {
        *self.attribute_status.lock() = status;
    }

    /// The hook request this port sends up the stack, pre-populated with
    /// its own port write and packet queue routines
    pub fn hook_request(self: &Arc<Self>) -> Request {
        let write: Arc<dyn IsrWritePort> = self.clone();
        let queue: Arc<dyn QueueKeyboardPacket> = self.clone();
        let call_context: OpaqueContext = Arc::new(String::from("i8042 port"));
        Request::hook_keyboard(HookKeyboard {
            isr_write_port: Some(write),
            queue_keyboard_packet: Some(queue),
            call_context: Some(call_context),
            ..HookKeyboard::default()
        })
    }

    /// Every request seen, in arrival order
    pub fn requests(&self) -> Vec<(MajorFunction, Option<IoControlCode>)> {
        self.requests.lock().clone()
    }

    /// Whether a connect request has reached the port
    pub fn is_connected(&self) -> bool {
        self.connect.lock().is_some()
    }

    /// Report a batch to whoever the connect request named.
    ///
    /// Returns the consumed count, or 0 when nothing is connected.
    pub fn report(&self, batch: &[KeyboardInputData]) -> usize {
        let connect = self.connect.lock().clone();
        match connect {
            Some(connect) => connect.deliver(batch),
            None => 0,
        }
    }

    /// Run the installed initialization routine.
    ///
    /// Returns the routine's status and the final translation flag, or
    /// `None` when no routine was installed.
    pub fn run_initialization(&self) -> Option<(Status, bool)> {
        let hooks = self.hooks.lock().clone()?;
        let routine = hooks.initialization_routine?;
        let mut translation = false;
        let status = routine.initialize(hooks.context.as_ref(), None, self, &mut translation);
        Some((status, translation))
    }

    /// Run the installed ISR hook for one byte.
    ///
    /// Returns the hook's result and the continue flag, or `None` when no
    /// hook was installed.
    pub fn run_isr(&self, status_byte: u8, data_byte: u8) -> Option<(bool, bool)> {
        let hooks = self.hooks.lock().clone()?;
        let routine = hooks.isr_routine?;
        let mut input = KeyboardInputData::default();
        let mut output = OutputPacket::default();
        let mut data = data_byte;
        let mut continue_processing = true;
        let mut scan_state = ScanState::Normal;
        let handled = routine.isr(
            hooks.context.as_ref(),
            &mut input,
            &mut output,
            status_byte,
            &mut data,
            &mut continue_processing,
            &mut scan_state,
        );
        Some((handled, continue_processing))
    }

    /// Bytes written through the ISR write routine
    pub fn port_writes(&self) -> Vec<u8> {
        self.port_writes.lock().clone()
    }

    /// Number of packets queued through the ISR queue routine
    pub fn queued_packets(&self) -> usize {
        *self.queued_packets.lock()
    }

    fn answer_attributes(&self, request: &mut Request) -> Status {
        let status = *self.attribute_status.lock();
        if !status.is_success() {
            request.complete(status, 0);
            return status;
        }
        if request.output_length < KeyboardAttributes::SIZE {
            request.complete(BUFFER_TOO_SMALL, 0);
            return BUFFER_TOO_SMALL;
        }
        request.output = self.attributes.to_bytes().to_vec();
        request.complete(Status::Success, KeyboardAttributes::SIZE);
        Status::Success
    }
}

impl LowerDevice for SimulatedPort {
    fn call_driver(&self, request: &mut Request) -> Status {
        self.requests.lock().push((request.major, request.control_code));

        if request.control_code == Some(IoControlCode::KeyboardQueryAttributes) {
            return self.answer_attributes(request);
        }

        match &request.input {
            RequestInput::Connect(data)
                if request.control_code == Some(IoControlCode::KeyboardConnect) =>
            {
                *self.connect.lock() = Some(data.clone());
            }
            RequestInput::HookKeyboard(hook)
                if request.control_code == Some(IoControlCode::I8042HookKeyboard) =>
            {
                *self.hooks.lock() = Some(hook.clone());
            }
            _ => {}
        }

        request.complete(Status::Success, 0);
        Status::Success
    }
}

impl SynchPort for SimulatedPort {
    fn read(&self, _wait: bool) -> Result<u8, Status> {
        // ACK
        Ok(0xFA)
    }

    fn write(&self, value: u8, _wait_for_ack: bool) -> Status {
        self.port_writes.lock().push(value);
        Status::Success
    }
}

impl IsrWritePort for SimulatedPort {
    fn write(&self, _context: Option<&OpaqueContext>, value: u8) {
        self.port_writes.lock().push(value);
    }
}

impl QueueKeyboardPacket for SimulatedPort {
    fn queue(&self, _context: Option<&OpaqueContext>) {
        *self.queued_packets.lock() += 1;
    }
}

/// Class consumer that records every batch it receives
#[derive(Debug, Default)]
pub struct RecordingClass {
    batches: Mutex<Vec<Vec<KeyboardInputData>>>,
    limit: Option<usize>,
}

impl RecordingClass {
    /// Consumer that takes every event it is given
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumer that takes at most `limit` events per call
    pub fn with_limit(limit: usize) -> Self {
        Self {
            batches: Mutex::new(Vec::new()),
            limit: Some(limit),
        }
    }

    /// Batches received so far
    pub fn batches(&self) -> Vec<Vec<KeyboardInputData>> {
        self.batches.lock().clone()
    }

    /// All events received, flattened
    pub fn events(&self) -> Vec<KeyboardInputData> {
        self.batches.lock().iter().flatten().copied().collect()
    }
}

impl ServiceCallback for RecordingClass {
    fn service(&self, _context: Option<&OpaqueContext>, input: &[KeyboardInputData]) -> usize {
        self.batches.lock().push(input.to_vec());
        match self.limit {
            Some(limit) => input.len().min(limit),
            None => input.len(),
        }
    }
}
