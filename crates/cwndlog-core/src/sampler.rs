//! Background sampler: polls a contiguous port range until stopped.
//!
//! Lifecycle is encoded in ownership. [`Sampler`] is the configured-but-idle
//! state; [`Sampler::start`] consumes it and returns a [`MonitorRun`];
//! [`MonitorRun::stop`] consumes the run and returns its [`RunSummary`]. A
//! stopped run cannot be restarted; build a new `Sampler` instead.
//!
//! Shutdown order is fixed: the loop sees the stop request, finishes the
//! pass it is in, closes the sink, then signals completion. `stop()` returns
//! only after all of that, so the output file is closed and holds complete
//! lines only.

use std::collections::HashSet;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::error::SamplerError;
use crate::querier::{DEFAULT_FIELDS, StateQuerier, field_list};
use crate::sample::unix_seconds_now;
use crate::sink::SampleWriter;
use crate::source::SocketStateSource;
use crate::summary::{RunSummary, StepOutcome};

/// Default pause after each pass over all ports.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Longest single sleep while waiting out the poll interval.
const SLEEP_SLICE: Duration = Duration::from_millis(10);

/// Configuration for a sampling run.
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    pub first_port: u16,
    /// Number of contiguous ports starting at `first_port`.
    pub flow_count: u16,
    pub output_path: PathBuf,
    pub run_label: String,
    /// Ordered TCP info fields written after the leading columns.
    pub fields: Vec<String>,
    pub poll_interval: Duration,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            first_port: 4242,
            flow_count: 1,
            output_path: PathBuf::from("cwnd_tcp.tr"),
            run_label: "0".to_string(),
            fields: field_list(DEFAULT_FIELDS),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl SamplerConfig {
    /// Monitored ports, ascending.
    pub fn ports(&self) -> Result<RangeInclusive<u16>, SamplerError> {
        if self.flow_count == 0 {
            return Err(SamplerError::NoFlows);
        }
        let last = self
            .first_port
            .checked_add(self.flow_count - 1)
            .ok_or(SamplerError::PortRange {
                first_port: self.first_port,
                flow_count: self.flow_count,
            })?;
        Ok(self.first_port..=last)
    }

    /// Check the config and return the port range it covers.
    pub fn validate(&self) -> Result<RangeInclusive<u16>, SamplerError> {
        let ports = self.ports()?;
        if self.fields.is_empty() {
            return Err(SamplerError::NoFields);
        }
        Ok(ports)
    }
}

/// A configured sampler that has not started yet.
pub struct Sampler<S> {
    config: SamplerConfig,
    querier: StateQuerier<S>,
}

impl<S: SocketStateSource + 'static> Sampler<S> {
    pub fn new(config: SamplerConfig, source: S) -> Self {
        let querier = StateQuerier::new(source, config.fields.clone());
        Self { config, querier }
    }

    /// Open the sink and spawn the background loop.
    ///
    /// Fails without spawning anything if the config is invalid or the output
    /// file cannot be created.
    pub fn start(self) -> Result<MonitorRun, SamplerError> {
        let ports = self.config.validate()?;

        let writer =
            SampleWriter::create(&self.config.output_path).map_err(|source| {
                SamplerError::SinkOpen {
                    path: self.config.output_path.clone(),
                    source,
                }
            })?;

        let enabled = Arc::new(AtomicBool::new(true));
        let ended = Arc::new(AtomicBool::new(false));

        info!(
            "monitoring start: ports {}..={} via {} -> {}",
            ports.start(),
            ports.end(),
            self.querier.source().name(),
            self.config.output_path.display()
        );

        let worker = PollLoop {
            config: self.config,
            querier: self.querier,
            ports,
            enabled: Arc::clone(&enabled),
            ended: Arc::clone(&ended),
        };
        let handle = thread::Builder::new()
            .name("cwnd_monitor".to_string())
            .spawn(move || worker.run(writer))
            .map_err(SamplerError::Thread)?;

        Ok(MonitorRun {
            enabled,
            ended,
            handle,
        })
    }
}

/// Handle to a running sampler.
pub struct MonitorRun {
    enabled: Arc<AtomicBool>,
    ended: Arc<AtomicBool>,
    handle: JoinHandle<RunSummary>,
}

impl MonitorRun {
    /// Ask the loop to stop after its current pass. Does not block.
    pub fn request_stop(&self) {
        self.enabled.store(false, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        !self.enabled.load(Ordering::SeqCst)
    }

    /// True once the sink is closed and the loop has exited.
    pub fn is_finished(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }

    /// Stop the run and wait for it to wind down.
    ///
    /// Waits for any in-flight query to finish; there is no hard kill.
    pub fn stop(self) -> RunSummary {
        self.request_stop();
        match self.handle.join() {
            Ok(summary) => summary,
            Err(panic) => {
                // The loop catches source panics, so this is a bug in the loop itself.
                RunSummary {
                    close_error: Some(format!(
                        "sampler thread panicked: {}",
                        panic_message(panic.as_ref())
                    )),
                    ..Default::default()
                }
            }
        }
    }
}

/// State moved into the background thread.
struct PollLoop<S> {
    config: SamplerConfig,
    querier: StateQuerier<S>,
    ports: RangeInclusive<u16>,
    enabled: Arc<AtomicBool>,
    ended: Arc<AtomicBool>,
}

impl<S: SocketStateSource> PollLoop<S> {
    fn run(self, mut writer: SampleWriter) -> RunSummary {
        let started = Instant::now();
        let mut summary = RunSummary::new(
            &self.config.run_label,
            self.config.output_path.clone(),
            self.config.first_port,
            self.config.flow_count,
            unix_seconds_now(),
        );
        let mut warned: HashSet<u16> = HashSet::new();

        while self.enabled.load(Ordering::SeqCst) {
            for port in self.ports.clone() {
                let outcome = self.poll_port(port, &mut writer);
                if let Some(reason) = outcome.failure_reason() {
                    if warned.insert(port) {
                        warn!("port {port}: {reason}");
                    } else {
                        debug!("port {port}: {reason}");
                    }
                }
                summary.record(port, &outcome);
            }
            summary.passes += 1;
            debug!(
                "pass {} done, {} samples so far",
                summary.passes, summary.samples_written
            );

            self.pause();
        }

        if let Err(e) = writer.finish() {
            summary.close_error = Some(e.to_string());
        }
        summary.duration_ms = started.elapsed().as_millis() as u64;

        if summary.has_errors() {
            warn!(
                "monitoring done WITH ERRORS: {} samples, {} query failures, {} write failures{}",
                summary.samples_written,
                summary.total_query_failures(),
                summary.write_failures,
                summary
                    .last_error
                    .as_deref()
                    .map(|e| format!(" (last: {e})"))
                    .unwrap_or_default()
            );
        } else {
            info!(
                "monitoring done: {} samples in {} passes",
                summary.samples_written, summary.passes
            );
        }

        self.ended.store(true, Ordering::SeqCst);
        summary
    }

    /// Query one port and stream its samples to the sink.
    fn poll_port(&self, port: u16, writer: &mut SampleWriter) -> StepOutcome {
        let queried = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.querier.query(&self.config.run_label, port)
        }));
        let samples = match queried {
            Ok(Ok(samples)) => samples,
            Ok(Err(e)) => return StepOutcome::QueryFailed(e),
            Err(panic) => return StepOutcome::Panicked(panic_message(panic.as_ref())),
        };
        if samples.is_empty() {
            return StepOutcome::Empty;
        }

        for (written, sample) in samples.iter().enumerate() {
            if let Err(error) = writer.write_sample(sample) {
                return StepOutcome::WriteFailed { written, error };
            }
        }
        StepOutcome::Written(samples.len())
    }

    /// Sleep for the poll interval, waking early if a stop is requested.
    fn pause(&self) {
        let deadline = Instant::now() + self.config.poll_interval;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() || !self.enabled.load(Ordering::SeqCst) {
                break;
            }
            thread::sleep(remaining.min(SLEEP_SLICE));
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueryError;

    struct NoConnections;

    impl SocketStateSource for NoConnections {
        fn name(&self) -> &str {
            "empty"
        }

        fn query(&self, _port: u16) -> Result<String, QueryError> {
            Ok(String::new())
        }
    }

    #[test]
    fn default_config_matches_collector_defaults() {
        let c = SamplerConfig::default();
        assert_eq!(c.first_port, 4242);
        assert_eq!(c.flow_count, 1);
        assert_eq!(c.fields, vec!["cwnd"]);
        assert_eq!(c.poll_interval, Duration::from_millis(20));
    }

    #[test]
    fn ports_are_contiguous() {
        let c = SamplerConfig {
            first_port: 5000,
            flow_count: 3,
            ..Default::default()
        };
        assert_eq!(c.ports().unwrap().collect::<Vec<_>>(), vec![5000, 5001, 5002]);
    }

    #[test]
    fn port_range_overflow_is_rejected() {
        let c = SamplerConfig {
            first_port: 65535,
            flow_count: 2,
            ..Default::default()
        };
        assert!(matches!(c.ports(), Err(SamplerError::PortRange { .. })));

        let c = SamplerConfig {
            first_port: 65535,
            flow_count: 1,
            ..Default::default()
        };
        assert_eq!(c.ports().unwrap().collect::<Vec<_>>(), vec![65535]);
    }

    #[test]
    fn zero_flows_and_empty_fields_are_rejected() {
        let c = SamplerConfig {
            flow_count: 0,
            ..Default::default()
        };
        assert!(matches!(c.validate(), Err(SamplerError::NoFlows)));

        let c = SamplerConfig {
            fields: Vec::new(),
            ..Default::default()
        };
        assert!(matches!(c.validate(), Err(SamplerError::NoFields)));
    }

    #[test]
    fn validate_returns_port_range() {
        let c = SamplerConfig {
            first_port: 6000,
            flow_count: 2,
            ..Default::default()
        };
        assert_eq!(c.validate().unwrap(), 6000..=6001);
    }

    #[test]
    fn invalid_config_fails_before_sink_is_created() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("never.tr");
        let config = SamplerConfig {
            output_path: path.clone(),
            fields: Vec::new(),
            ..Default::default()
        };
        let err = Sampler::new(config, NoConnections).start().err().unwrap();
        assert!(matches!(err, SamplerError::NoFields));
        assert!(!path.exists());
    }

    #[test]
    fn unopenable_sink_fails_start() {
        let tmp = tempfile::tempdir().unwrap();
        let config = SamplerConfig {
            output_path: tmp.path().join("missing/dir/out.tr"),
            ..Default::default()
        };
        let err = Sampler::new(config, NoConnections).start().err().unwrap();
        assert!(matches!(err, SamplerError::SinkOpen { .. }));
    }

    #[test]
    fn stop_returns_after_closing_sink() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out.tr");
        let config = SamplerConfig {
            output_path: path.clone(),
            poll_interval: Duration::from_millis(1),
            ..Default::default()
        };
        let run = Sampler::new(config, NoConnections).start().unwrap();
        thread::sleep(Duration::from_millis(20));
        assert!(!run.is_finished());

        let summary = run.stop();
        assert!(summary.passes >= 1);
        assert!(!summary.has_errors());
        assert_eq!(summary.samples_written, 0);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn panic_message_extracts_str_and_string() {
        assert_eq!(panic_message(&"boom"), "boom");
        assert_eq!(panic_message(&"bang".to_string()), "bang");
        assert_eq!(panic_message(&42u8), "unknown panic");
    }
}
