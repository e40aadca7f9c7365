//! Error types for devsync-core

use std::path::PathBuf;

use crate::transfer::TransferStage;

/// Result type for devsync-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in devsync-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A sync target does not name a usable local file or directory
    #[error("Invalid target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    /// The root a manifest was requested for does not exist
    #[error("Manifest unavailable for {origin} root {root}")]
    ManifestUnavailable { origin: String, root: String },

    /// A transfer step failed before any file reached the remote side
    #[error("Transfer failed during {stage}: {message}")]
    TransferFailure { stage: TransferStage, message: String },

    /// The user declined a deletion
    #[error("Deletion of {count} remote file(s) was declined")]
    DeletionDenied { count: usize },

    /// The sync configuration is incomplete or inconsistent
    #[error("Invalid configuration: {message}")]
    Config { message: String },

    /// The watch loop could not be started or crashed
    #[error("Watch failed: {message}")]
    WatchFailed { message: String },

    /// Remote command or copy failed
    #[error(transparent)]
    Remote(#[from] devsync_remote::RemoteError),

    /// Filesystem error from devsync-fs
    #[error(transparent)]
    Fs(#[from] devsync_fs::Error),

    /// Local I/O error
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn invalid_target(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTarget {
            target: target.into(),
            reason: reason.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
