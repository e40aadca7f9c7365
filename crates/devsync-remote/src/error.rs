//! Error types for remote operations

use std::path::PathBuf;

/// Errors that can occur while talking to the remote host
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// Remote command exited with non-zero status
    #[error("Remote command failed (exit code {exit_code}): {}", .stderr.trim())]
    Execution {
        /// The command as issued
        command: String,
        /// Exit code reported by the remote side, -1 when killed by a signal
        exit_code: i32,
        /// Captured stderr output
        stderr: String,
    },

    /// The local helper program (gcloud, sh) could not be started
    #[error("Failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Local filesystem error during a copy
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RemoteError {
    /// Exit code of a failed remote command, if this is one.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Execution { exit_code, .. } => Some(*exit_code),
            _ => None,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for remote operations
pub type Result<T> = std::result::Result<T, RemoteError>;
