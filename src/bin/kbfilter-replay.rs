// Kbfilter Replay CLI
// Plays a recorded keystroke trace through a simulated keyboard filter stack

#![cfg_attr(feature = "pure-rust", allow(dead_code))]

#[cfg(feature = "pure-rust")]
use std::path::PathBuf;
#[cfg(feature = "pure-rust")]
use std::sync::Arc;
#[cfg(feature = "pure-rust")]
use std::time::Duration;

#[cfg(feature = "pure-rust")]
use clap::Parser;
#[cfg(feature = "pure-rust")]
use parking_lot::Mutex;

#[cfg(feature = "pure-rust")]
use kbfilter_core::replay::{load_trace, SimulatedPort, TraceBatch};
#[cfg(feature = "pure-rust")]
use kbfilter_core::{
    ConnectData, FilterDevice, FilterOptions, FilterSettings, KeyboardAttributes,
    KeyboardInputData, ManualClock, OpaqueContext, Request, ServiceCallback, Status, KEY_E0,
    KEY_E1,
};

/// Replay keystroke traces through the duplicate press filter
#[cfg(feature = "pure-rust")]
#[derive(Parser, Debug)]
#[command(name = "kbfilter-replay")]
#[command(author = "kbfilter contributors")]
#[command(version = "0.3.0")]
#[command(about = "Replay keystroke traces through the keyboard filter", long_about = None)]
struct Args {
    /// Trace file to replay
    #[arg(value_name = "TRACE")]
    trace: PathBuf,

    /// TOML settings file (default: ~/.config/kbfilter/settings.toml)
    #[arg(short, long, value_name = "SETTINGS")]
    config: Option<PathBuf>,

    /// Override the suppression window in milliseconds
    #[arg(short, long, value_name = "MS")]
    threshold_ms: Option<u64>,

    /// Replay with filtering switched off
    #[arg(long)]
    no_filter: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Only print the summary
    #[arg(short, long)]
    quiet: bool,
}

/// Class consumer that prints what reaches the top of the stack
#[cfg(feature = "pure-rust")]
struct PrintingClass {
    quiet: bool,
    delivered: Mutex<usize>,
}

#[cfg(feature = "pure-rust")]
impl ServiceCallback for PrintingClass {
    fn service(&self, _context: Option<&OpaqueContext>, input: &[KeyboardInputData]) -> usize {
        *self.delivered.lock() += input.len();
        if !self.quiet {
            let rendered: Vec<String> = input.iter().map(format_event).collect();
            println!("    delivered: {}", rendered.join(" "));
        }
        input.len()
    }
}

#[cfg(feature = "pure-rust")]
fn format_event(event: &KeyboardInputData) -> String {
    let prefix = if event.flags & KEY_E0 != 0 {
        ":e0"
    } else if event.flags & KEY_E1 != 0 {
        ":e1"
    } else {
        ""
    };
    let direction = if event.is_release() { '-' } else { '+' };
    format!("{:#04x}{}{}", event.make_code, prefix, direction)
}

/// Main application state
#[cfg(feature = "pure-rust")]
struct Application {
    args: Args,
    settings: FilterSettings,
}

#[cfg(feature = "pure-rust")]
impl Application {
    fn new(args: Args) -> Result<Self, Box<dyn std::error::Error>> {
        let mut settings = match &args.config {
            Some(path) => FilterSettings::from_file(path)?,
            None => FilterSettings::load_default()?,
        };
        if let Some(threshold_ms) = args.threshold_ms {
            if threshold_ms == 0 {
                return Err("--threshold-ms must be greater than zero".into());
            }
            settings = settings.with_threshold(Duration::from_millis(threshold_ms));
        }
        if args.no_filter {
            settings = settings.with_enabled(false);
        }
        Ok(Self { args, settings })
    }

    fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        let batches = load_trace(&self.args.trace)?;
        log::info!(
            "replaying {} batches from {} (threshold {}ms, filtering {})",
            batches.len(),
            self.args.trace.display(),
            self.settings.threshold().as_millis(),
            if self.settings.enabled() { "on" } else { "off" }
        );

        let port = Arc::new(SimulatedPort::new(KeyboardAttributes::enhanced_101()));
        let clock = Arc::new(ManualClock::new());
        let filter = FilterDevice::attach(
            port.clone(),
            FilterOptions::default()
                .with_settings(self.settings.clone())
                .with_clock(clock.clone()),
        );

        // Bring the stack up in the order the port driver would
        expect_success("hook keyboard", filter.dispatch(&mut port.hook_request()))?;
        if let Some((status, translation)) = port.run_initialization() {
            log::debug!("initialization: {} (translation {})", status, translation);
        }
        expect_success(
            "query attributes",
            filter.dispatch(&mut Request::query_attributes(KeyboardAttributes::SIZE)),
        )?;
        if let Some(attributes) = filter.cached_attributes() {
            log::info!(
                "keyboard: {} keys, {} function keys, {} indicators",
                attributes.number_of_keys_total,
                attributes.number_of_function_keys,
                attributes.number_of_indicators
            );
        }

        let class = Arc::new(PrintingClass {
            quiet: self.args.quiet,
            delivered: Mutex::new(0),
        });
        expect_success(
            "connect",
            filter.dispatch(&mut Request::connect(ConnectData::new(None, class.clone()))),
        )?;

        for batch in &batches {
            self.replay_batch(&port, &clock, batch);
        }

        let stats = filter.stats();
        println!(
            "{} batches, {} events, {} delivered, {} suppressed, {} unfiltered (fail-open)",
            stats.batches,
            stats.events,
            *class.delivered.lock(),
            stats.suppressed,
            stats.fail_open
        );
        Ok(())
    }

    fn replay_batch(&self, port: &SimulatedPort, clock: &ManualClock, batch: &TraceBatch) {
        clock.set_elapsed(batch.at);
        if !self.args.quiet {
            let rendered: Vec<String> = batch.events.iter().map(format_event).collect();
            println!("{:>8}ms  input: {}", batch.at.as_millis(), rendered.join(" "));
        }
        let consumed = port.report(&batch.events);
        if consumed != batch.events.len() {
            log::debug!(
                "line {}: consumed {} of {} events",
                batch.line,
                consumed,
                batch.events.len()
            );
        }
    }
}

#[cfg(feature = "pure-rust")]
fn expect_success(what: &str, status: Status) -> Result<(), Box<dyn std::error::Error>> {
    if status.is_success() {
        Ok(())
    } else {
        Err(format!("{} failed: {}", what, status).into())
    }
}

#[cfg(feature = "pure-rust")]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let app = Application::new(args)?;
    app.run()
}

// Stub for when pure-rust feature is not enabled
#[cfg(not(feature = "pure-rust"))]
fn main() {
    eprintln!("Error: kbfilter-replay requires the 'pure-rust' feature to be enabled.");
    eprintln!("Please build with: cargo build --release --features pure-rust --bin kbfilter-replay");
    std::process::exit(1);
}
