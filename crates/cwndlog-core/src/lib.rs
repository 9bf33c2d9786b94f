//! # cwndlog-core
//!
//! **High-frequency TCP congestion-window sampling.**
//!
//! `cwndlog-core` polls the kernel's socket state for a range of local ports,
//! parses the per-connection TCP info (`cwnd`, `ssthresh`, `rtt`, rates, …)
//! and streams one tab-separated record per connection per poll to a log file
//! for offline congestion-control analysis.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//! use cwndlog_core::{Sampler, SamplerConfig, SsCommand};
//!
//! let config = SamplerConfig {
//!     first_port: 5201,
//!     flow_count: 4,
//!     output_path: "cwnd_tcp.tr".into(),
//!     run_label: "run-1".to_string(),
//!     ..Default::default()
//! };
//!
//! let run = Sampler::new(config, SsCommand::new()).start()?;
//! std::thread::sleep(Duration::from_secs(10));
//! let summary = run.stop();
//! println!("{} samples, errors: {}", summary.samples_written, summary.has_errors());
//! # Ok::<(), cwndlog_core::SamplerError>(())
//! ```
//!
//! ## Architecture
//!
//! Source (`ss`) → parser → [`StateQuerier`] → [`Sampler`] loop → [`SampleWriter`]
//!
//! Every source implements the [`SocketStateSource`] trait. Per-port failures
//! never stop a run; they are folded into the [`RunSummary`] returned by
//! [`MonitorRun::stop`].

pub mod command;
pub mod error;
pub mod parser;
pub mod querier;
pub mod sample;
pub mod sampler;
pub mod sink;
pub mod source;
pub mod summary;

pub use error::{QueryError, SamplerError};
pub use parser::{
    ConnectionBlock, FieldMap, RATE_FIELD, Token, classify_token, extract_fields,
    parse_ss_output, parse_tcp_info,
};
pub use querier::{DEFAULT_FIELDS, EXTENDED_FIELDS, StateQuerier, field_list};
pub use sample::Sample;
pub use sampler::{DEFAULT_POLL_INTERVAL, MonitorRun, Sampler, SamplerConfig};
pub use sink::SampleWriter;
pub use source::{SocketStateSource, SsCommand};
pub use summary::{RunSummary, StepOutcome};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
