//! `cwndlog record` - sample congestion windows until stopped.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use cwndlog_core::{RunSummary, Sampler, SamplerConfig, SocketStateSource};

use super::make_source;

/// How often the foreground checks for Ctrl+C / duration expiry.
const STOP_POLL: Duration = Duration::from_millis(100);

/// Exit code for a run that finished but recorded errors.
const EXIT_WITH_ERRORS: i32 = 2;

pub struct RecordCommandConfig<'a> {
    pub first_port: u16,
    pub flows: u16,
    pub output: &'a str,
    pub label: &'a str,
    pub fields: Vec<String>,
    pub interval: Duration,
    pub duration: Option<Duration>,
    pub ss_path: Option<&'a str>,
    pub summary_path: Option<&'a str>,
}

/// Run the record command.
pub fn run(cfg: RecordCommandConfig<'_>) {
    let source = make_source(cfg.ss_path);
    if !source.is_available() {
        log::warn!(
            "{} not found; every query will fail until it is installed",
            source.program().display()
        );
    }

    let config = SamplerConfig {
        first_port: cfg.first_port,
        flow_count: cfg.flows,
        output_path: PathBuf::from(cfg.output),
        run_label: cfg.label.to_string(),
        fields: cfg.fields,
        poll_interval: cfg.interval,
    };

    // Set up Ctrl+C handler before starting so an early interrupt is not lost
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    }) {
        eprintln!("Error setting Ctrl+C handler: {e}");
        std::process::exit(1);
    }

    println!("Recording congestion windows");
    println!(
        "  Ports:     {}..{} ({} flows)",
        config.first_port,
        u32::from(config.first_port) + u32::from(config.flow_count.max(1)) - 1,
        config.flow_count
    );
    println!("  Fields:    {}", config.fields.join(","));
    println!("  Label:     {}", config.run_label);
    println!("  Interval:  {}ms", config.poll_interval.as_millis());
    match cfg.duration {
        Some(d) => println!("  Duration:  {:.1}s", d.as_secs_f64()),
        None => println!("  Duration:  until Ctrl+C"),
    }
    println!("  Output:    {}", config.output_path.display());
    println!();

    let run = match Sampler::new(config, source).start() {
        Ok(run) => run,
        Err(e) => {
            eprintln!("Error starting sampler: {e}");
            std::process::exit(1);
        }
    };

    let start = Instant::now();
    while running.load(Ordering::SeqCst) {
        if cfg.duration.is_some_and(|max| start.elapsed() >= max) {
            break;
        }
        std::thread::sleep(STOP_POLL);
    }

    let summary = run.stop();
    print_summary(&summary);

    if let Some(path) = cfg.summary_path {
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => {
                if let Err(e) = std::fs::write(path, json) {
                    eprintln!("Error writing summary to {path}: {e}");
                } else {
                    println!("  Summary:   {path}");
                }
            }
            Err(e) => eprintln!("Error serializing summary: {e}"),
        }
    }

    if summary.has_errors() {
        std::process::exit(EXIT_WITH_ERRORS);
    }
}

fn print_summary(summary: &RunSummary) {
    let status = if summary.has_errors() {
        "completed WITH ERRORS"
    } else {
        "completed"
    };
    println!("Recording {status}");
    println!("  Samples:   {}", summary.samples_written);
    println!("  Passes:    {}", summary.passes);
    println!("  Elapsed:   {:.1}s", summary.duration_ms as f64 / 1000.0);
    if summary.has_errors() {
        for (port, n) in &summary.query_failures {
            println!("  Port {port}: {n} failed queries");
        }
        if summary.write_failures > 0 {
            println!("  Write failures: {}", summary.write_failures);
        }
        if let Some(e) = &summary.close_error {
            println!("  Close error: {e}");
        }
        if let Some(e) = &summary.last_error {
            println!("  Last error: {e}");
        }
    }
    println!("  Saved to:  {}", summary.output_path.display());
}
