// Kbfilter Hook Chain
// Records the layers above this filter and forwards through them

use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use crate::hook::{
    ConnectData, HookKeyboard, InitializationHook, IsrHook, IsrWritePort, OpaqueContext,
    OutputPacket, QueueKeyboardPacket, ScanState, ServiceCallback, SynchPort,
};
use crate::input::KeyboardInputData;
use crate::status::Status;

/// Hooks and port handles recorded by the i8042 hook request
#[derive(Clone, Default)]
pub struct UpperHooks {
    pub context: Option<OpaqueContext>,
    pub initialization_routine: Option<Arc<dyn InitializationHook>>,
    pub isr_routine: Option<Arc<dyn IsrHook>>,
    pub isr_write_port: Option<Arc<dyn IsrWritePort>>,
    pub queue_keyboard_packet: Option<Arc<dyn QueueKeyboardPacket>>,
    pub call_context: Option<OpaqueContext>,
}

impl std::fmt::Debug for UpperHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpperHooks")
            .field("context", &self.context.is_some())
            .field("initialization_routine", &self.initialization_routine.is_some())
            .field("isr_routine", &self.isr_routine.is_some())
            .field("isr_write_port", &self.isr_write_port.is_some())
            .field("queue_keyboard_packet", &self.queue_keyboard_packet.is_some())
            .field("call_context", &self.call_context.is_some())
            .finish()
    }
}

/// The two registration points of one filter layer.
///
/// `upstream` is the consumer recorded at connect time and can be set only
/// once. `upper` holds whatever initialization and ISR hooks were installed
/// before this layer; the chain itself is what gets installed in their place.
#[derive(Debug, Default)]
pub struct HookChain {
    upstream: OnceLock<ConnectData>,
    upper: RwLock<Option<Arc<UpperHooks>>>,
}

impl HookChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a consumer has been recorded
    pub fn is_connected(&self) -> bool {
        self.upstream.get().is_some()
    }

    /// The recorded consumer
    pub fn upstream(&self) -> Option<&ConnectData> {
        self.upstream.get()
    }

    /// Record the caller's consumer and put `entry` in its place.
    ///
    /// Fails with `SharingViolation` if a consumer is already recorded and
    /// with `InvalidParameter` if the payload carries no service. On
    /// failure `connect` is left as it was.
    pub fn connect(
        &self,
        connect: &mut ConnectData,
        entry_context: Option<OpaqueContext>,
        entry: Arc<dyn ServiceCallback>,
    ) -> Result<(), Status> {
        if self.is_connected() {
            return Err(Status::SharingViolation);
        }
        if connect.class_service.is_none() {
            return Err(Status::InvalidParameter);
        }

        self.upstream
            .set(connect.clone())
            .map_err(|_| Status::SharingViolation)?;

        connect.class_device = entry_context;
        connect.class_service = Some(entry);
        Ok(())
    }

    /// Whether the i8042 hook request has been handled
    pub fn hooks_installed(&self) -> bool {
        self.upper.read().is_some()
    }

    /// Snapshot of the recorded upper hooks
    pub fn upper(&self) -> Option<Arc<UpperHooks>> {
        self.upper.read().clone()
    }

    /// Record the hooks in `hook` and install this chain in their place.
    ///
    /// A routine already present is kept when a later request leaves the
    /// field empty. This chain is never recorded as its own upper hook.
    pub fn install(self: &Arc<Self>, hook: &mut HookKeyboard) {
        let mut upper = self.upper.write();
        let previous = upper.take();

        let incoming_init = hook
            .initialization_routine
            .take()
            .filter(|routine| !self.is_self(routine));
        let incoming_isr = hook
            .isr_routine
            .take()
            .filter(|routine| !self.is_self(routine));
        let incoming_context = hook.context.take().filter(|context| !self.is_self(context));

        // Routines kept from an earlier request keep the context they were
        // registered with
        let context = if incoming_init.is_none() && incoming_isr.is_none() {
            incoming_context.or_else(|| previous.as_ref().and_then(|p| p.context.clone()))
        } else {
            incoming_context
        };
        let initialization_routine = incoming_init
            .or_else(|| previous.as_ref().and_then(|p| p.initialization_routine.clone()));
        let isr_routine =
            incoming_isr.or_else(|| previous.as_ref().and_then(|p| p.isr_routine.clone()));

        *upper = Some(Arc::new(UpperHooks {
            context,
            initialization_routine,
            isr_routine,
            isr_write_port: hook.isr_write_port.clone(),
            queue_keyboard_packet: hook.queue_keyboard_packet.clone(),
            call_context: hook.call_context.clone(),
        }));
        drop(upper);

        let own: Arc<HookChain> = Arc::clone(self);
        hook.context = Some(own.clone());
        hook.initialization_routine = Some(own.clone());
        hook.isr_routine = Some(own);
    }

    fn is_self<T: ?Sized>(&self, routine: &Arc<T>) -> bool {
        std::ptr::eq(Arc::as_ptr(routine) as *const (), self as *const Self as *const ())
    }

    /// Write a byte through the port driver's ISR write routine.
    ///
    /// Returns false when no write routine was recorded.
    pub fn write_port(&self, value: u8) -> bool {
        let Some(upper) = self.upper() else {
            return false;
        };
        match &upper.isr_write_port {
            Some(port) => {
                port.write(upper.call_context.as_ref(), value);
                true
            }
            None => false,
        }
    }

    /// Ask the port driver to queue the packet being assembled.
    ///
    /// Returns false when no queue routine was recorded.
    pub fn queue_current_packet(&self) -> bool {
        let Some(upper) = self.upper() else {
            return false;
        };
        match &upper.queue_keyboard_packet {
            Some(queue) => {
                queue.queue(upper.call_context.as_ref());
                true
            }
            None => false,
        }
    }
}

impl InitializationHook for HookChain {
    fn initialize(
        &self,
        _context: Option<&OpaqueContext>,
        synch_context: Option<&OpaqueContext>,
        port: &dyn SynchPort,
        turn_translation_on: &mut bool,
    ) -> Status {
        let mut status = Status::Success;

        if let Some(upper) = self.upper() {
            if let Some(routine) = &upper.initialization_routine {
                status = routine.initialize(
                    upper.context.as_ref(),
                    synch_context,
                    port,
                    turn_translation_on,
                );
                if !status.is_success() {
                    return status;
                }
            }
        }

        *turn_translation_on = true;
        status
    }
}

impl IsrHook for HookChain {
    fn isr(
        &self,
        _context: Option<&OpaqueContext>,
        current_input: &mut KeyboardInputData,
        current_output: &mut OutputPacket,
        status_byte: u8,
        data_byte: &mut u8,
        continue_processing: &mut bool,
        scan_state: &mut ScanState,
    ) -> bool {
        let mut handled = true;

        if let Some(upper) = self.upper() {
            if let Some(routine) = &upper.isr_routine {
                handled = routine.isr(
                    upper.context.as_ref(),
                    current_input,
                    current_output,
                    status_byte,
                    data_byte,
                    continue_processing,
                    scan_state,
                );
                if !handled || !*continue_processing {
                    return handled;
                }
            }
        }

        *continue_processing = true;
        handled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        calls: AtomicUsize,
    }

    impl ServiceCallback for Counting {
        fn service(&self, _context: Option<&OpaqueContext>, input: &[KeyboardInputData]) -> usize {
            self.calls.fetch_add(1, Ordering::SeqCst);
            input.len()
        }
    }

    struct NullPort;

    impl SynchPort for NullPort {
        fn read(&self, _wait: bool) -> Result<u8, Status> {
            Ok(0xFA)
        }

        fn write(&self, _value: u8, _wait_for_ack: bool) -> Status {
            Status::Success
        }
    }

    struct FixedInit {
        result: Status,
        seen_context: Mutex<Option<u32>>,
    }

    impl InitializationHook for FixedInit {
        fn initialize(
            &self,
            context: Option<&OpaqueContext>,
            _synch_context: Option<&OpaqueContext>,
            _port: &dyn SynchPort,
            turn_translation_on: &mut bool,
        ) -> Status {
            *self.seen_context.lock() = context.and_then(|c| c.downcast_ref::<u32>().copied());
            *turn_translation_on = false;
            self.result
        }
    }

    fn counting() -> Arc<Counting> {
        Arc::new(Counting {
            calls: AtomicUsize::new(0),
        })
    }

    #[test]
    fn test_connect_swaps_in_entry_point() {
        let chain = HookChain::new();
        let class = counting();
        let entry = counting();
        let mut data = ConnectData::new(None, class.clone());

        chain.connect(&mut data, None, entry.clone()).unwrap();
        assert!(chain.is_connected());

        data.deliver(&[KeyboardInputData::press(0x1E)]);
        assert_eq!(entry.calls.load(Ordering::SeqCst), 1);
        assert_eq!(class.calls.load(Ordering::SeqCst), 0);

        chain.upstream().unwrap().deliver(&[KeyboardInputData::press(0x1E)]);
        assert_eq!(class.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_second_connect_is_sharing_violation() {
        let chain = HookChain::new();
        let first = counting();
        let second = counting();
        let mut data = ConnectData::new(None, first.clone());
        chain.connect(&mut data, None, counting()).unwrap();

        let mut again = ConnectData::new(None, second.clone());
        assert_eq!(
            chain.connect(&mut again, None, counting()),
            Err(Status::SharingViolation)
        );

        // The caller's payload is untouched and the first consumer remains
        assert!(Arc::ptr_eq(
            again.class_service.as_ref().unwrap(),
            &(second as Arc<dyn ServiceCallback>)
        ));
        chain.upstream().unwrap().deliver(&[KeyboardInputData::press(1)]);
        assert_eq!(first.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_connect_without_service_is_rejected() {
        let chain = HookChain::new();
        let mut data = ConnectData::default();
        assert_eq!(
            chain.connect(&mut data, None, counting()),
            Err(Status::InvalidParameter)
        );
        assert!(!chain.is_connected());
    }

    #[test]
    fn test_initialize_without_upper_turns_translation_on() {
        let chain = Arc::new(HookChain::new());
        let mut hook = HookKeyboard::default();
        chain.install(&mut hook);

        let mut translation = false;
        let status = hook.initialization_routine.unwrap().initialize(
            hook.context.as_ref(),
            None,
            &NullPort,
            &mut translation,
        );
        assert_eq!(status, Status::Success);
        assert!(translation);
    }

    #[test]
    fn test_initialize_forwards_upper_context_and_stops_on_failure() {
        let upper = Arc::new(FixedInit {
            result: Status::Unsuccessful,
            seen_context: Mutex::new(None),
        });
        let chain = Arc::new(HookChain::new());
        let mut hook = HookKeyboard {
            context: Some(Arc::new(7u32)),
            initialization_routine: Some(upper.clone()),
            ..HookKeyboard::default()
        };
        chain.install(&mut hook);

        let mut translation = true;
        let status = chain.initialize(None, None, &NullPort, &mut translation);
        assert_eq!(status, Status::Unsuccessful);
        // The upper hook's write stands; this layer did not override it
        assert!(!translation);
        assert_eq!(*upper.seen_context.lock(), Some(7));
    }

    #[test]
    fn test_reinstall_keeps_existing_routine_when_field_empty() {
        let upper = Arc::new(FixedInit {
            result: Status::Success,
            seen_context: Mutex::new(None),
        });
        let chain = Arc::new(HookChain::new());
        let mut first = HookKeyboard {
            initialization_routine: Some(upper.clone()),
            ..HookKeyboard::default()
        };
        chain.install(&mut first);

        let mut second = HookKeyboard::default();
        chain.install(&mut second);

        let recorded = chain.upper().unwrap();
        assert!(recorded.initialization_routine.is_some());
    }

    #[test]
    fn test_reinstall_never_records_itself() {
        let chain = Arc::new(HookChain::new());
        let mut hook = HookKeyboard::default();
        chain.install(&mut hook);
        // Feed our own routines back in
        chain.install(&mut hook);

        let recorded = chain.upper().unwrap();
        assert!(recorded.initialization_routine.is_none());
        assert!(recorded.isr_routine.is_none());

        let mut translation = false;
        assert!(chain.initialize(None, None, &NullPort, &mut translation).is_success());
    }

    #[test]
    fn test_reinstall_of_own_payload_keeps_upper_context() {
        let upper = Arc::new(FixedInit {
            result: Status::Success,
            seen_context: Mutex::new(None),
        });
        let chain = Arc::new(HookChain::new());
        let mut hook = HookKeyboard {
            context: Some(Arc::new(7u32)),
            initialization_routine: Some(upper.clone()),
            ..HookKeyboard::default()
        };
        chain.install(&mut hook);
        // The payload now carries this chain; feed it back in
        chain.install(&mut hook);

        let recorded = chain.upper().unwrap();
        assert!(recorded.initialization_routine.is_some());
        assert!(!chain.is_self(recorded.context.as_ref().unwrap()));

        let mut translation = true;
        assert!(chain.initialize(None, None, &NullPort, &mut translation).is_success());
        assert_eq!(*upper.seen_context.lock(), Some(7));
    }

    #[test]
    fn test_reinstall_with_new_routine_takes_new_context() {
        let first = Arc::new(FixedInit {
            result: Status::Success,
            seen_context: Mutex::new(None),
        });
        let second = Arc::new(FixedInit {
            result: Status::Success,
            seen_context: Mutex::new(None),
        });
        let chain = Arc::new(HookChain::new());
        chain.install(&mut HookKeyboard {
            context: Some(Arc::new(7u32)),
            initialization_routine: Some(first.clone()),
            ..HookKeyboard::default()
        });
        chain.install(&mut HookKeyboard {
            context: Some(Arc::new(9u32)),
            initialization_routine: Some(second.clone()),
            ..HookKeyboard::default()
        });

        let mut translation = false;
        chain.initialize(None, None, &NullPort, &mut translation);
        assert_eq!(*second.seen_context.lock(), Some(9));
        assert_eq!(*first.seen_context.lock(), None);
    }

    #[test]
    fn test_port_handles_unavailable_before_install() {
        let chain = HookChain::new();
        assert!(!chain.write_port(0xED));
        assert!(!chain.queue_current_packet());
    }
}
