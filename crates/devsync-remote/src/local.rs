//! Executor that treats this machine as the remote host
//!
//! Useful when the TPU VM is the machine devsync runs on, and for exercising
//! the full sync pipeline without a network.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use walkdir::WalkDir;

use crate::error::{RemoteError, Result};
use crate::executor::{CommandOutput, RemoteExecutor, run_process};

/// Runs commands with `sh -c` and copies with the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalExecutor {
    shell: PathBuf,
}

impl Default for LocalExecutor {
    fn default() -> Self {
        Self {
            shell: PathBuf::from("sh"),
        }
    }
}

impl LocalExecutor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RemoteExecutor for LocalExecutor {
    fn run(&self, command: &str) -> Result<CommandOutput> {
        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c").arg(command);
        run_process(&mut cmd, &self.shell.to_string_lossy(), command)
    }

    fn copy_to(&self, local: &Path, remote: &str, recursive: bool) -> Result<()> {
        copy(local, &expand_home(remote), recursive)
    }

    fn copy_from(&self, remote: &str, local: &Path, recursive: bool) -> Result<()> {
        copy(&expand_home(remote), local, recursive)
    }

    fn describe(&self) -> String {
        "localhost".to_string()
    }
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), std::env::var_os("HOME")) {
        (Some(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => PathBuf::from(path),
    }
}

fn copy(source: &Path, dest: &Path, recursive: bool) -> Result<()> {
    tracing::debug!(source = %source.display(), dest = %dest.display(), recursive, "local copy");

    if source.is_dir() {
        if !recursive {
            return Err(RemoteError::io(
                source,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "is a directory; recursive copy required"),
            ));
        }
        for entry in WalkDir::new(source) {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(source).to_path_buf();
                RemoteError::io(path, e.into())
            })?;
            let Ok(relative) = entry.path().strip_prefix(source) else {
                continue;
            };
            let target = dest.join(relative);
            if entry.file_type().is_dir() {
                fs::create_dir_all(&target).map_err(|e| RemoteError::io(&target, e))?;
            } else {
                copy_file(entry.path(), &target)?;
            }
        }
        return Ok(());
    }

    copy_file(source, dest)
}

fn copy_file(source: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| RemoteError::io(parent, e))?;
    }
    fs::copy(source, dest).map_err(|e| RemoteError::io(source, e))?;
    Ok(())
}
