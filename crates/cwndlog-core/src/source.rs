//! Socket-state source trait and the `ss`-backed implementation.
//!
//! Every source implements [`SocketStateSource`], which returns the raw text
//! the query tool printed for one local port. Parsing lives in
//! [`crate::parser`]; sources only fetch.

use std::path::PathBuf;

use crate::command::{command_exists, run_command};
use crate::error::QueryError;

/// Default program name, resolved through `PATH`.
pub const DEFAULT_SS_PROGRAM: &str = "ss";

/// Trait that every socket-state source must implement.
pub trait SocketStateSource: Send + Sync {
    /// Short identifier used in log lines.
    fn name(&self) -> &str;

    /// Check if this source can operate on the current machine.
    fn is_available(&self) -> bool {
        true
    }

    /// Fetch the raw text describing established TCP connections whose local
    /// port is `port`.
    fn query(&self, port: u16) -> Result<String, QueryError>;
}

impl<S: SocketStateSource + ?Sized> SocketStateSource for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn query(&self, port: u16) -> Result<String, QueryError> {
        (**self).query(port)
    }
}

/// Queries the kernel through iproute2's `ss`.
///
/// Runs `ss -into state established "( sport = :<port> )"`: numeric
/// addresses, TCP only, with timer and internal TCP info, so each
/// connection prints an address line followed by an info line.
#[derive(Debug, Clone)]
pub struct SsCommand {
    program: PathBuf,
}

impl SsCommand {
    pub fn new() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_SS_PROGRAM),
        }
    }

    /// Use a specific `ss` binary, e.g. `/bin/ss`.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &std::path::Path {
        &self.program
    }

    /// Arguments passed for a single-port query.
    pub fn args_for(port: u16) -> Vec<String> {
        vec![
            "-into".to_string(),
            "state".to_string(),
            "established".to_string(),
            format!("( sport = :{port} )"),
        ]
    }
}

impl Default for SsCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl SocketStateSource for SsCommand {
    fn name(&self) -> &str {
        "ss"
    }

    fn is_available(&self) -> bool {
        if self.program.components().count() > 1 {
            self.program.exists()
        } else {
            command_exists(&self.program.to_string_lossy())
        }
    }

    fn query(&self, port: u16) -> Result<String, QueryError> {
        let program = self.program.to_string_lossy();
        let args = Self::args_for(port);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        run_command(&program, &args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_filter_on_source_port() {
        let args = SsCommand::args_for(4242);
        assert_eq!(args, vec!["-into", "state", "established", "( sport = :4242 )"]);
    }

    #[test]
    fn missing_program_is_unavailable() {
        let ss = SsCommand::with_program("/nonexistent/bin/ss");
        assert!(!ss.is_available());
    }

    #[test]
    fn missing_program_fails_query() {
        let ss = SsCommand::with_program("/nonexistent/bin/ss");
        let err = ss.query(4242).unwrap_err();
        assert!(matches!(err, QueryError::Spawn { .. }));
    }

    #[test]
    fn default_program_is_ss() {
        assert_eq!(SsCommand::default().program(), std::path::Path::new("ss"));
    }
}
