//! Executors for asserting on remote traffic

use std::path::Path;
use std::sync::Mutex;

use devsync_remote::{CommandOutput, LocalExecutor, RemoteError, RemoteExecutor, Result};

/// Wraps a [`LocalExecutor`] and records every call.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    inner: LocalExecutor,
    calls: Mutex<Vec<String>>,
    offline: bool,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record calls without executing them; every call succeeds with empty
    /// output. For commands that must never run on the test host.
    pub fn offline() -> Self {
        Self {
            offline: true,
            ..Self::default()
        }
    }

    /// Every call so far, as `run: <cmd>`, `copy_to: <remote>` or
    /// `copy_from: <remote>`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl RemoteExecutor for RecordingExecutor {
    fn run(&self, command: &str) -> Result<CommandOutput> {
        self.record(format!("run: {command}"));
        if self.offline {
            return Ok(CommandOutput::default());
        }
        self.inner.run(command)
    }

    fn copy_to(&self, local: &Path, remote: &str, recursive: bool) -> Result<()> {
        self.record(format!("copy_to: {remote}"));
        if self.offline {
            return Ok(());
        }
        self.inner.copy_to(local, remote, recursive)
    }

    fn copy_from(&self, remote: &str, local: &Path, recursive: bool) -> Result<()> {
        self.record(format!("copy_from: {remote}"));
        if self.offline {
            return Ok(());
        }
        self.inner.copy_from(remote, local, recursive)
    }

    fn describe(&self) -> String {
        "recording".to_string()
    }
}

/// Wraps a [`LocalExecutor`] and fails any command containing `needle`
/// with exit code 1. Copies fail when `fail_copies` is set.
#[derive(Debug)]
pub struct FailingExecutor {
    inner: LocalExecutor,
    needle: String,
    fail_copies: bool,
}

impl FailingExecutor {
    pub fn failing_commands_with(needle: &str) -> Self {
        Self {
            inner: LocalExecutor::new(),
            needle: needle.to_string(),
            fail_copies: false,
        }
    }

    pub fn failing_copies() -> Self {
        Self {
            inner: LocalExecutor::new(),
            needle: String::new(),
            fail_copies: true,
        }
    }

    fn injected(what: &str) -> RemoteError {
        RemoteError::Execution {
            command: what.to_string(),
            exit_code: 1,
            stderr: "injected failure".to_string(),
        }
    }
}

impl RemoteExecutor for FailingExecutor {
    fn run(&self, command: &str) -> Result<CommandOutput> {
        if !self.needle.is_empty() && command.contains(&self.needle) {
            return Err(Self::injected(command));
        }
        self.inner.run(command)
    }

    fn copy_to(&self, local: &Path, remote: &str, recursive: bool) -> Result<()> {
        if self.fail_copies {
            return Err(Self::injected(remote));
        }
        self.inner.copy_to(local, remote, recursive)
    }

    fn copy_from(&self, remote: &str, local: &Path, recursive: bool) -> Result<()> {
        if self.fail_copies {
            return Err(Self::injected(remote));
        }
        self.inner.copy_from(remote, local, recursive)
    }

    fn describe(&self) -> String {
        "failing".to_string()
    }
}
