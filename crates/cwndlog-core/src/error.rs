//! Error types for querying socket state and running the sampler.

use std::path::PathBuf;
use std::process::ExitStatus;

/// Failure to obtain socket-state text from the external query tool.
///
/// A `QueryError` never stops a run: the sampler counts it against the port
/// and moves on to the next one.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// The tool could not be started (missing binary, permission denied).
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool ran but exited unsuccessfully.
    #[error("`{program}` exited with {status}: {stderr}")]
    ExitStatus {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    /// Failure injected or reported by a non-process source.
    #[error("{0}")]
    Source(String),
}

/// Failure that prevents a run from starting.
#[derive(Debug, thiserror::Error)]
pub enum SamplerError {
    #[error("flow count must be at least 1")]
    NoFlows,

    #[error("port range {first_port}+{flow_count} exceeds 65535")]
    PortRange { first_port: u16, flow_count: u16 },

    #[error("no output fields configured")]
    NoFields,

    #[error("failed to open output {}: {source}", .path.display())]
    SinkOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to spawn sampler thread: {0}")]
    Thread(#[source] std::io::Error),
}
