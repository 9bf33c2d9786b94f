//! Per-step outcomes and the run-level summary reported at stop time.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::QueryError;

/// Result of querying one port and writing its samples.
#[derive(Debug)]
pub enum StepOutcome {
    /// Samples were queried and all of them written.
    Written(usize),
    /// The port had no established connections.
    Empty,
    /// The query tool failed; nothing was written for this port.
    QueryFailed(QueryError),
    /// The source panicked; nothing was written for this port.
    Panicked(String),
    /// Writing stopped part-way through this port's samples.
    WriteFailed {
        written: usize,
        error: std::io::Error,
    },
}

impl StepOutcome {
    /// Human-readable failure reason, if any.
    pub fn failure_reason(&self) -> Option<String> {
        match self {
            Self::QueryFailed(e) => Some(e.to_string()),
            Self::Panicked(msg) => Some(format!("query panicked: {msg}")),
            Self::WriteFailed { error, .. } => Some(format!("write failed: {error}")),
            Self::Written(_) | Self::Empty => None,
        }
    }
}

/// Aggregated outcome of a whole run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_label: String,
    pub output_path: PathBuf,
    pub first_port: u16,
    pub flow_count: u16,
    /// Completed passes over all ports.
    pub passes: u64,
    pub samples_written: u64,
    /// Queries that returned no connections.
    pub empty_queries: u64,
    /// Failed queries (tool errors or panics) per port.
    pub query_failures: BTreeMap<u16, u64>,
    pub write_failures: u64,
    pub close_error: Option<String>,
    pub last_error: Option<String>,
    /// Wall-clock start, seconds since the Unix epoch.
    pub started_at: f64,
    pub duration_ms: u64,
    pub cwndlog_version: String,
}

impl RunSummary {
    pub fn new(
        run_label: &str,
        output_path: PathBuf,
        first_port: u16,
        flow_count: u16,
        started_at: f64,
    ) -> Self {
        Self {
            run_label: run_label.to_string(),
            output_path,
            first_port,
            flow_count,
            started_at,
            cwndlog_version: crate::VERSION.to_string(),
            ..Default::default()
        }
    }

    /// Fold one per-port outcome into the totals.
    pub fn record(&mut self, port: u16, outcome: &StepOutcome) {
        match outcome {
            StepOutcome::Written(n) => self.samples_written += *n as u64,
            StepOutcome::Empty => self.empty_queries += 1,
            StepOutcome::QueryFailed(_) | StepOutcome::Panicked(_) => {
                *self.query_failures.entry(port).or_insert(0) += 1;
            }
            StepOutcome::WriteFailed { written, .. } => {
                self.samples_written += *written as u64;
                self.write_failures += 1;
            }
        }
        if let Some(reason) = outcome.failure_reason() {
            self.last_error = Some(format!("port {port}: {reason}"));
        }
    }

    pub fn total_query_failures(&self) -> u64 {
        self.query_failures.values().sum()
    }

    /// True if anything went wrong during the run, including closing the sink.
    pub fn has_errors(&self) -> bool {
        self.total_query_failures() > 0 || self.write_failures > 0 || self.close_error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> RunSummary {
        RunSummary::new("0", PathBuf::from("cwnd_tcp.tr"), 4242, 2, 0.0)
    }

    #[test]
    fn clean_run_has_no_errors() {
        let mut s = summary();
        s.record(4242, &StepOutcome::Written(3));
        s.record(4243, &StepOutcome::Empty);
        assert!(!s.has_errors());
        assert_eq!(s.samples_written, 3);
        assert_eq!(s.empty_queries, 1);
        assert!(s.last_error.is_none());
    }

    #[test]
    fn query_failures_are_counted_per_port() {
        let mut s = summary();
        s.record(4243, &StepOutcome::QueryFailed(QueryError::Source("gone".into())));
        s.record(4243, &StepOutcome::Panicked("boom".into()));
        s.record(4242, &StepOutcome::Written(1));
        assert!(s.has_errors());
        assert_eq!(s.query_failures.get(&4243), Some(&2));
        assert_eq!(s.query_failures.get(&4242), None);
        assert_eq!(s.last_error.as_deref(), Some("port 4243: query panicked: boom"));
    }

    #[test]
    fn partial_write_counts_written_samples() {
        let mut s = summary();
        s.record(
            4242,
            &StepOutcome::WriteFailed {
                written: 2,
                error: std::io::Error::other("disk full"),
            },
        );
        assert_eq!(s.samples_written, 2);
        assert_eq!(s.write_failures, 1);
        assert!(s.has_errors());
    }

    #[test]
    fn only_failed_steps_have_a_reason() {
        assert!(StepOutcome::Written(4).failure_reason().is_none());
        assert!(StepOutcome::Empty.failure_reason().is_none());
        assert_eq!(
            StepOutcome::Panicked("oops".into()).failure_reason().as_deref(),
            Some("query panicked: oops")
        );
        let write = StepOutcome::WriteFailed {
            written: 0,
            error: std::io::Error::other("disk full"),
        };
        assert_eq!(write.failure_reason().as_deref(), Some("write failed: disk full"));
    }

    #[test]
    fn close_error_marks_run() {
        let mut s = summary();
        s.close_error = Some("sync failed".into());
        assert!(s.has_errors());
    }

    #[test]
    fn serialization_roundtrip() {
        let mut s = summary();
        s.record(4243, &StepOutcome::QueryFailed(QueryError::Source("x".into())));
        let json = serde_json::to_string_pretty(&s).unwrap();
        let parsed: RunSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.query_failures.get(&4243), Some(&1));
        assert_eq!(parsed.flow_count, 2);
    }
}
