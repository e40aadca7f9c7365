//! Error types for devsync-cli

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that can occur in CLI operations
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Error from devsync-core
    #[error(transparent)]
    Core(#[from] devsync_core::Error),

    /// Error from devsync-fs
    #[error(transparent)]
    Fs(#[from] devsync_fs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Missing or inconsistent settings
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// User-facing error with a message
    #[error("{message}")]
    User { message: String },

    /// The sync ran but some files failed
    #[error("{failed} operation(s) failed; re-run the sync to retry")]
    PartialFailure { failed: usize },
}

impl CliError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn user(message: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
        }
    }

    /// Process exit code: 2 for a partial failure, 1 for everything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::PartialFailure { .. } => 2,
            _ => 1,
        }
    }
}
