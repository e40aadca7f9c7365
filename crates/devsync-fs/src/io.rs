//! Small file helpers used by the config store

use std::fs;
use std::io::Write;

use fs2::FileExt;
use tempfile::NamedTempFile;

use crate::{Error, NormalizedPath, Result};

/// Replace `path` with `content` so that readers see either the old file or
/// the new one, never a truncated mix.
///
/// The temp file is created next to the target so the final rename stays on
/// one filesystem. It is held under an exclusive lock while being written.
pub fn write_atomic(path: &NormalizedPath, content: &[u8]) -> Result<()> {
    let target = path.to_native();
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::path::PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;

    let mut staged = tempfile::Builder::new()
        .prefix(".devsync-")
        .suffix(".tmp")
        .tempfile_in(&dir)
        .map_err(|e| Error::io(&dir, e))?;
    fill(&mut staged, content).map_err(|e| Error::io(staged.path(), e))?;

    staged
        .persist(&target)
        .map_err(|e| Error::io(&target, e.error))?;

    tracing::debug!(path = %path, bytes = content.len(), "wrote file atomically");
    Ok(())
}

fn fill(staged: &mut NamedTempFile, content: &[u8]) -> std::io::Result<()> {
    let file = staged.as_file_mut();
    file.lock_exclusive()?;
    file.write_all(content)?;
    file.sync_all()?;
    file.unlock()
}

pub fn read_text(path: &NormalizedPath) -> Result<String> {
    let native = path.to_native();
    fs::read_to_string(&native).map_err(|e| Error::io(&native, e))
}
