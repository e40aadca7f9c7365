//! The remote executor abstraction

use std::path::Path;
use std::process::Command;

use crate::error::{RemoteError, Result};

/// Captured result of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandOutput {
    /// Non-empty stdout lines, trimmed.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.stdout.lines().map(str::trim).filter(|line| !line.is_empty())
    }
}

/// Run commands on, and copy files to or from, the remote host.
///
/// Calls block until completion and carry no timeout. A command that exits
/// non-zero is reported as [`RemoteError::Execution`].
pub trait RemoteExecutor: Send + Sync {
    /// Execute a shell command on the remote host.
    fn run(&self, command: &str) -> Result<CommandOutput>;

    /// Copy a local file (or directory when `recursive`) to `remote`.
    fn copy_to(&self, local: &Path, remote: &str, recursive: bool) -> Result<()>;

    /// Copy a remote file (or directory when `recursive`) to `local`.
    fn copy_from(&self, remote: &str, local: &Path, recursive: bool) -> Result<()>;

    /// Human-readable name of the remote host, for messages.
    fn describe(&self) -> String;
}

/// Swallow the failure of a secondary command, logging it.
///
/// Use for cleanup and verification calls whose failure must not abort the
/// operation that issued them.
pub fn best_effort<T>(result: Result<T>, what: &str) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(operation = what, error = %e, "best-effort remote call failed");
            None
        }
    }
}

/// Run a prepared local process and turn a non-zero exit into an error.
///
/// `shown` is what gets recorded as the command in errors and logs.
pub(crate) fn run_process(cmd: &mut Command, program: &str, shown: &str) -> Result<CommandOutput> {
    tracing::debug!(command = %shown, "running");

    let output = cmd.output().map_err(|source| RemoteError::Spawn {
        program: program.to_string(),
        source,
    })?;

    let result = CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code().unwrap_or(-1),
    };

    if output.status.success() {
        Ok(result)
    } else {
        Err(RemoteError::Execution {
            command: shown.to_string(),
            exit_code: result.exit_code,
            stderr: result.stderr,
        })
    }
}
