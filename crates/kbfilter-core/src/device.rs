// Kbfilter Filter Device
// Per-device filter state and the request entry point of the filter layer

use std::sync::Arc;

use parking_lot::RwLock;

use crate::clock::{Clock, SystemClock};
use crate::dispatch::{completion, internal, Disposition, MajorFunction, Request};
use crate::filter::dedup::consumed_in_original;
use crate::filter::{
    DedupEngine, FilterOutcome, FilterStats, HeapScratch, ScratchAllocator, StatsSnapshot,
    UnfilteredReason,
};
use crate::hook::{HookChain, OpaqueContext, ServiceCallback};
use crate::input::{KeyboardAttributes, KeyboardInputData};
use crate::settings::FilterSettings;
use crate::status::Status;

/// The next device down the stack
pub trait LowerDevice: Send + Sync {
    /// Process a request and set its `io_status`, returning the status
    fn call_driver(&self, request: &mut Request) -> Status;
}

/// Construction options for a filter device
#[derive(Clone)]
pub struct FilterOptions {
    pub settings: FilterSettings,
    pub clock: Arc<dyn Clock>,
    pub scratch: Arc<dyn ScratchAllocator>,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            settings: FilterSettings::default(),
            clock: Arc::new(SystemClock),
            scratch: Arc::new(HeapScratch),
        }
    }
}

impl FilterOptions {
    pub fn with_settings(mut self, settings: FilterSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_scratch(mut self, scratch: Arc<dyn ScratchAllocator>) -> Self {
        self.scratch = scratch;
        self
    }
}

/// State shared between the control path and the event path of one device.
///
/// After connect this is also the delivery entry point handed to the port
/// driver: every batch comes through [`ServiceCallback::service`].
#[derive(Debug)]
pub struct FilterState {
    chain: Arc<HookChain>,
    dedup: DedupEngine,
    attributes: RwLock<Option<KeyboardAttributes>>,
    stats: FilterStats,
}

impl FilterState {
    pub fn new(options: FilterOptions) -> Self {
        let FilterOptions {
            settings,
            clock,
            scratch,
        } = options;

        Self {
            chain: Arc::new(HookChain::new()),
            dedup: DedupEngine::new(settings.threshold(), settings.enabled(), clock, scratch),
            attributes: RwLock::new(None),
            stats: FilterStats::new(),
        }
    }

    pub fn chain(&self) -> &Arc<HookChain> {
        &self.chain
    }

    pub fn dedup(&self) -> &DedupEngine {
        &self.dedup
    }

    /// Last descriptor captured from an attribute query
    pub fn cached_attributes(&self) -> Option<KeyboardAttributes> {
        *self.attributes.read()
    }

    pub(crate) fn store_attributes(&self, attributes: KeyboardAttributes) {
        *self.attributes.write() = Some(attributes);
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

impl ServiceCallback for FilterState {
    fn service(&self, _context: Option<&OpaqueContext>, input: &[KeyboardInputData]) -> usize {
        self.stats.record_batch(input.len());

        let Some(upstream) = self.chain.upstream() else {
            log::warn!("batch of {} events arrived before connect", input.len());
            return 0;
        };

        match self.dedup.filter(input) {
            FilterOutcome::Unfiltered(reason) => {
                if reason == UnfilteredReason::ScratchUnavailable {
                    self.stats.record_fail_open();
                }
                upstream.deliver(input)
            }
            FilterOutcome::Filtered(kept) => {
                self.stats.record_suppressed(input.len() - kept.len());
                if kept.is_empty() {
                    return 0;
                }
                let consumed = upstream.deliver(&kept.events);
                consumed_in_original(&kept, consumed, input.len())
            }
        }
    }
}

/// A filter layer attached above one lower device
pub struct FilterDevice {
    state: Arc<FilterState>,
    lower: Arc<dyn LowerDevice>,
}

impl FilterDevice {
    /// Attach a new filter, with empty state, above `lower`
    pub fn attach(lower: Arc<dyn LowerDevice>, options: FilterOptions) -> Self {
        log::debug!(
            "attaching keyboard filter (threshold {}ms, enabled {})",
            options.settings.threshold().as_millis(),
            options.settings.enabled()
        );
        Self {
            state: Arc::new(FilterState::new(options)),
            lower,
        }
    }

    /// Entry point for every request sent to this layer
    pub fn dispatch(&self, request: &mut Request) -> Status {
        match request.major {
            MajorFunction::InternalDeviceControl => self.dispatch_internal_device_control(request),
            _ => self.dispatch_general(request),
        }
    }

    /// Requests this layer has no interest in go straight down
    fn dispatch_general(&self, request: &mut Request) -> Status {
        self.lower.call_driver(request)
    }

    fn dispatch_internal_device_control(&self, request: &mut Request) -> Status {
        match internal::handle(&self.state, request) {
            Disposition::Complete(status) => {
                request.complete(status, 0);
                status
            }
            Disposition::Forward => self.lower.call_driver(request),
            Disposition::ForwardWithCapture => {
                let status = self.lower.call_driver(request);
                // Capture only reads the completed request
                completion::capture_attributes(&self.state, request);
                status
            }
        }
    }

    pub fn state(&self) -> &Arc<FilterState> {
        &self.state
    }

    pub fn cached_attributes(&self) -> Option<KeyboardAttributes> {
        self.state.cached_attributes()
    }

    pub fn is_connected(&self) -> bool {
        self.state.chain().is_connected()
    }

    pub fn hooks_installed(&self) -> bool {
        self.state.chain().hooks_installed()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.state.stats()
    }

    /// Write a byte to the controller through the port driver's ISR routine
    pub fn write_port(&self, value: u8) -> bool {
        self.state.chain().write_port(value)
    }

    /// Ask the port driver to queue the packet currently being assembled
    pub fn queue_current_packet(&self) -> bool {
        self.state.chain().queue_current_packet()
    }
}

/// Filters stack: a filter can sit below another filter
impl LowerDevice for FilterDevice {
    fn call_driver(&self, request: &mut Request) -> Status {
        self.dispatch(request)
    }
}

impl Drop for FilterDevice {
    fn drop(&mut self) {
        log::debug!("detaching keyboard filter");
    }
}
