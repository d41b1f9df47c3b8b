// Kbfilter Replay Tests
//
// Plays the bundled demo trace through a simulated stack and checks what
// reaches the class consumer.
//
// Run with: cargo test --test replay_test

use std::path::PathBuf;
use std::sync::Arc;

use kbfilter_core::replay::{load_trace, parse_trace, RecordingClass, SimulatedPort, TraceBatch};
use kbfilter_core::{
    ConnectData, FilterDevice, FilterOptions, FilterSettings, KeyboardAttributes, ManualClock,
    Request, Status,
};

fn demo_trace() -> Vec<TraceBatch> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../demos/glitchy-keyboard.trace");
    load_trace(path).unwrap()
}

fn replay(batches: &[TraceBatch], settings: FilterSettings) -> (FilterDevice, Arc<RecordingClass>) {
    let port = Arc::new(SimulatedPort::new(KeyboardAttributes::enhanced_101()));
    let clock = Arc::new(ManualClock::new());
    let filter = FilterDevice::attach(
        port.clone(),
        FilterOptions::default()
            .with_settings(settings)
            .with_clock(clock.clone()),
    );
    let class = Arc::new(RecordingClass::new());
    let mut connect = Request::connect(ConnectData::new(None, class.clone()));
    assert_eq!(filter.dispatch(&mut connect), Status::Success);

    for batch in batches {
        clock.set_elapsed(batch.at);
        port.report(&batch.events);
    }
    (filter, class)
}

#[test]
fn test_demo_trace_loads() {
    let batches = demo_trace();
    assert_eq!(batches.len(), 8);
    assert_eq!(batches.iter().map(|b| b.events.len()).sum::<usize>(), 13);
}

#[test]
fn test_demo_trace_suppresses_chatter() {
    let (filter, class) = replay(&demo_trace(), FilterSettings::new());

    let stats = filter.stats();
    assert_eq!(stats.batches, 8);
    assert_eq!(stats.events, 13);
    assert_eq!(stats.suppressed, 2);
    assert_eq!(class.events().len(), 11);
    // The batch at 90ms was entirely chatter and never reached the class
    assert_eq!(class.batches().len(), 7);
}

#[test]
fn test_demo_trace_unfiltered() {
    let (filter, class) = replay(&demo_trace(), FilterSettings::new().with_enabled(false));
    assert_eq!(filter.stats().suppressed, 0);
    assert_eq!(class.events().len(), 13);
}

#[test]
fn test_burst_inside_one_batch() {
    let batches = parse_trace("0 0x1e+ 0x1e+ 0x1e+ 0x1e+ 0x1e-").unwrap();
    let (filter, class) = replay(&batches, FilterSettings::new());
    assert_eq!(class.events().len(), 2);
    assert_eq!(filter.stats().suppressed, 3);
}
