// Kbfilter Hook Interfaces
// Call signatures shared by every layer in the delivery and i8042 hook chains
//
// Each layer that inserts itself records whatever was installed before it
// and forwards to it, so filters stack without knowing about each other.

pub mod chain;

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::input::KeyboardInputData;
use crate::status::Status;

pub use chain::{HookChain, UpperHooks};

/// Context handle passed back to a callback alongside each call.
///
/// Layers never look inside another layer's context; they only hand it
/// back to the routine it was registered with.
pub type OpaqueContext = Arc<dyn Any + Send + Sync>;

/// Consumer of delivered input batches (the class service callback)
pub trait ServiceCallback: Send + Sync {
    /// Deliver a batch, returning how many events were consumed
    fn service(&self, context: Option<&OpaqueContext>, input: &[KeyboardInputData]) -> usize;
}

/// Synchronous port access offered to initialization routines
pub trait SynchPort: Send + Sync {
    /// Read one byte from the keyboard
    fn read(&self, wait: bool) -> Result<u8, Status>;

    /// Write one byte to the keyboard, optionally waiting for the ACK
    fn write(&self, value: u8, wait_for_ack: bool) -> Status;
}

/// Keyboard initialization routine, called after reset, typematic and LED setup
pub trait InitializationHook: Send + Sync {
    /// `turn_translation_on` set to true keeps the controller translating
    /// scan code set 2 into set 1.
    fn initialize(
        &self,
        context: Option<&OpaqueContext>,
        synch_context: Option<&OpaqueContext>,
        port: &dyn SynchPort,
        turn_translation_on: &mut bool,
    ) -> Status;
}

/// Prefix state of the scan code being assembled by the ISR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanState {
    #[default]
    Normal,
    GotE0,
    GotE1,
}

/// Bytes queued for transmission to the keyboard or controller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputPacket {
    pub bytes: Vec<u8>,
    pub current_byte: usize,
}

/// Interrupt-time hook, called for every byte read from the controller
pub trait IsrHook: Send + Sync {
    /// Returns false to report failure. Setting `continue_processing` to
    /// false makes the port driver return from the interrupt right away;
    /// the hook is then responsible for reporting the packet itself.
    #[allow(clippy::too_many_arguments)]
    fn isr(
        &self,
        context: Option<&OpaqueContext>,
        current_input: &mut KeyboardInputData,
        current_output: &mut OutputPacket,
        status_byte: u8,
        data_byte: &mut u8,
        continue_processing: &mut bool,
        scan_state: &mut ScanState,
    ) -> bool;
}

/// Interrupt-time port write supplied by the port driver
pub trait IsrWritePort: Send + Sync {
    fn write(&self, context: Option<&OpaqueContext>, value: u8);
}

/// Queues the packet currently being assembled by the ISR
pub trait QueueKeyboardPacket: Send + Sync {
    fn queue(&self, context: Option<&OpaqueContext>);
}

/// Payload of the connect request: who receives delivered batches
#[derive(Clone, Default)]
pub struct ConnectData {
    pub class_device: Option<OpaqueContext>,
    pub class_service: Option<Arc<dyn ServiceCallback>>,
}

impl ConnectData {
    /// Size of the payload on the wire (two pointers)
    pub const WIRE_SIZE: usize = 16;

    pub fn new(class_device: Option<OpaqueContext>, class_service: Arc<dyn ServiceCallback>) -> Self {
        Self {
            class_device,
            class_service: Some(class_service),
        }
    }

    /// Invoke the recorded service with its context.
    ///
    /// With no service recorded nothing is consumed.
    pub fn deliver(&self, input: &[KeyboardInputData]) -> usize {
        match &self.class_service {
            Some(service) => service.service(self.class_device.as_ref(), input),
            None => 0,
        }
    }
}

impl fmt::Debug for ConnectData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectData")
            .field("class_device", &self.class_device.is_some())
            .field("class_service", &self.class_service.is_some())
            .finish()
    }
}

/// Payload of the i8042 hook request.
///
/// Lower layers may pre-populate any field; each filter swaps in its own
/// routines and context and keeps the originals.
#[derive(Clone, Default)]
pub struct HookKeyboard {
    pub context: Option<OpaqueContext>,
    pub initialization_routine: Option<Arc<dyn InitializationHook>>,
    pub isr_routine: Option<Arc<dyn IsrHook>>,
    pub isr_write_port: Option<Arc<dyn IsrWritePort>>,
    pub queue_keyboard_packet: Option<Arc<dyn QueueKeyboardPacket>>,
    pub call_context: Option<OpaqueContext>,
}

impl HookKeyboard {
    /// Size of the payload on the wire (six pointers)
    pub const WIRE_SIZE: usize = 48;
}

impl fmt::Debug for HookKeyboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookKeyboard")
            .field("context", &self.context.is_some())
            .field("initialization_routine", &self.initialization_routine.is_some())
            .field("isr_routine", &self.isr_routine.is_some())
            .field("isr_write_port", &self.isr_write_port.is_some())
            .field("queue_keyboard_packet", &self.queue_keyboard_packet.is_some())
            .field("call_context", &self.call_context.is_some())
            .finish()
    }
}
