//! tridentd - Trident telemetry collector daemon.
//!
//! Reads semicolon-delimited measurement lines from a named pipe, groups
//! them using the headings file and writes metric points to stdout, either
//! as JSON lines or as collectd `PUTVAL` commands (for the exec plugin).

use tikv_jemallocator::Jemalloc;
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::io::{self, Stdout};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use trident::collector::{Engine, RealFs};
use trident::config::{TridentConfig, parse_option_pair};
use trident::plugin::Plugin;
use trident::sink::{JsonLinesSink, MetricSink, PutvalSink};
use trident::util::hostname;

/// Output encoding for metric points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// One JSON object per line.
    Json,
    /// collectd plain-text protocol.
    Putval,
}

/// Trident telemetry collector daemon.
#[derive(Parser)]
#[command(name = "tridentd", about = "Trident telemetry collector daemon", version)]
struct Args {
    /// Named pipe carrying the measurement lines.
    #[arg(long, env = "TRIDENT_FIFO")]
    fifo: Option<String>,

    /// File holding the semicolon-delimited column headings.
    #[arg(long, env = "TRIDENT_HEADINGS")]
    headings: Option<String>,

    /// Default sampling interval and poll cadence in seconds.
    #[arg(short, long, env = "TRIDENT_INTERVAL")]
    interval: Option<u64>,

    /// Extra option in host syntax, e.g. `Interval=30`. Repeatable.
    #[arg(short = 'o', long = "option", value_name = "KEY=VALUE", value_parser = parse_option_pair)]
    options: Vec<(String, String)>,

    /// Output format.
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Host name used in PUTVAL identifiers. Defaults to the system host name.
    #[arg(long)]
    hostname: Option<String>,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    /// Collects all configuration sources as host options, in precedence order.
    fn host_options(&self) -> Vec<(String, String)> {
        let mut options = Vec::new();
        if let Some(fifo) = &self.fifo {
            options.push(("Fifo".to_string(), fifo.clone()));
        }
        if let Some(headings) = &self.headings {
            options.push(("Headings".to_string(), headings.clone()));
        }
        if let Some(interval) = self.interval {
            options.push(("Interval".to_string(), interval.to_string()));
        }
        options.extend(self.options.iter().cloned());
        options
    }
}

/// Initializes the tracing subscriber with the appropriate log level.
/// Logs go to stderr; stdout carries the metric points.
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    for target in ["tridentd", "trident"] {
        if let Ok(directive) = format!("{}={}", target, level).parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn build_sink(args: &Args, stdout: Stdout) -> Box<dyn MetricSink> {
    match args.format {
        OutputFormat::Json => Box::new(JsonLinesSink::new(stdout)),
        OutputFormat::Putval => {
            let host = args.hostname.clone().unwrap_or_else(hostname);
            info!("PUTVAL identifiers use host '{}'", host);
            Box::new(PutvalSink::new(stdout, host))
        }
    }
}

fn main() {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    info!("tridentd {} starting", env!("CARGO_PKG_VERSION"));

    let sink = build_sink(&args, io::stdout());
    let mut engine = Engine::new(RealFs::new(), sink, TridentConfig::default());
    engine.init();

    if let Err(e) = engine.apply_config(&args.host_options()) {
        error!("Invalid configuration: {}", e);
        std::process::exit(2);
    }

    let config = engine.config();
    info!(
        "Config: fifo={}, headings={}, interval={}s, format={:?}",
        config.fifo_path.display(),
        config.headings_path.display(),
        config.interval_secs,
        args.format
    );
    let interval = Duration::from_secs(config.interval_secs);

    // Setup graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    info!("Starting read loop");

    let mut total_points: u64 = 0;
    let mut stream_open = false;

    while running.load(Ordering::SeqCst) {
        match Plugin::poll_once(&mut engine) {
            Ok(summary) => {
                total_points += summary.points as u64;
                for e in &summary.line_errors {
                    warn!("{}", e);
                }
                if summary.points > 0 {
                    debug!(
                        "Dispatched {} points from {} lines ({} total)",
                        summary.points, summary.lines, total_points
                    );
                }
            }
            Err(e) => {
                error!("Read cycle failed: {}", e);
            }
        }

        if engine.is_stream_open() != stream_open {
            stream_open = engine.is_stream_open();
            if stream_open {
                info!("Reading from {}", engine.config().fifo_path.display());
            } else {
                info!("Waiting for {}", engine.config().fifo_path.display());
            }
        }

        // Sleep with periodic checks for shutdown signal
        let sleep_interval = Duration::from_millis(100);
        let mut remaining = interval;
        while remaining > Duration::ZERO && running.load(Ordering::SeqCst) {
            let sleep_time = remaining.min(sleep_interval);
            std::thread::sleep(sleep_time);
            remaining = remaining.saturating_sub(sleep_time);
        }
    }

    info!("Shutting down...");
    Plugin::shutdown(&mut engine);
    info!("Shutdown complete ({} points dispatched)", total_points);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_options_follow_flag_order() {
        let args = Args::parse_from([
            "tridentd",
            "--fifo",
            "/run/trident.fifo",
            "--interval",
            "5",
            "-o",
            "Interval=20",
        ]);
        assert_eq!(
            args.host_options(),
            vec![
                ("Fifo".to_string(), "/run/trident.fifo".to_string()),
                ("Interval".to_string(), "5".to_string()),
                ("Interval".to_string(), "20".to_string()),
            ]
        );

        let mut config = TridentConfig::default();
        config.apply_options(&args.host_options()).unwrap();
        assert_eq!(config.interval_secs, 20);
    }

    #[test]
    fn format_defaults_to_json() {
        let args = Args::parse_from(["tridentd"]);
        assert_eq!(args.format, OutputFormat::Json);
        let args = Args::parse_from(["tridentd", "--format", "putval"]);
        assert_eq!(args.format, OutputFormat::Putval);
    }
}
