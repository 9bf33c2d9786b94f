//! Shared command utilities for shelling out to system tools.

use std::process::{Command, Output, Stdio};

use crate::error::QueryError;

/// Check if a command exists by running `which`.
pub fn command_exists(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Execute a command and return its `Output` if it exits successfully.
fn run_command_output(program: &str, args: &[&str]) -> Result<Output, QueryError> {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|source| QueryError::Spawn {
            program: program.to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(QueryError::ExitStatus {
            program: program.to_string(),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(output)
}

/// Run a subprocess command and return its stdout as a `String`.
///
/// Blocks until the child exits. There is no timeout: a hung tool hangs the
/// caller.
pub fn run_command(program: &str, args: &[&str]) -> Result<String, QueryError> {
    let output = run_command_output(program, args)?;
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_command_echo() {
        let out = run_command("echo", &["hello"]).unwrap();
        assert_eq!(out.trim(), "hello");
    }

    #[test]
    fn run_command_nonexistent() {
        let err = run_command("/nonexistent/binary", &[]).unwrap_err();
        assert!(matches!(err, QueryError::Spawn { .. }));
    }

    #[test]
    fn run_command_failing_status() {
        // `false` always exits with status 1
        let err = run_command("false", &[]).unwrap_err();
        assert!(matches!(err, QueryError::ExitStatus { .. }));
    }

    #[test]
    fn run_command_empty_output() {
        let out = run_command("true", &[]).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn command_exists_true() {
        assert!(command_exists("echo"));
    }

    #[test]
    fn command_exists_false() {
        assert!(!command_exists("nonexistent_binary_xyz_12345"));
    }
}
