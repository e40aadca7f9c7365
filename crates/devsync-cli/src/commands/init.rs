//! Init command implementation

use std::path::Path;

use colored::Colorize;
use devsync_core::config::{DEFAULT_CONTAINER_PATH, DEFAULT_LOCAL_ROOT, DEFAULT_REMOTE_TMP, DEFAULT_STAGING_PATH};
use devsync_fs::{ConfigStore, NormalizedPath};

use crate::cli::RemoteArgs;
use crate::config::{DEFAULT_WORKER, ExecutorKind, FileConfig};
use crate::error::{CliError, Result};

/// Build the config a fresh `init` writes: whatever flags and environment
/// provide, with defaults filled in for the rest.
pub fn initial_config(args: &RemoteArgs) -> FileConfig {
    let mut file = FileConfig::default().with_overrides(args);
    file.remote.executor.get_or_insert(ExecutorKind::Gcloud);
    if file.remote.executor == Some(ExecutorKind::Gcloud) {
        file.remote.worker.get_or_insert_with(|| DEFAULT_WORKER.to_string());
    }
    file.sync.local_root.get_or_insert_with(|| DEFAULT_LOCAL_ROOT.into());
    file.sync.staging_path.get_or_insert_with(|| DEFAULT_STAGING_PATH.to_string());
    file.sync.container_path.get_or_insert_with(|| DEFAULT_CONTAINER_PATH.to_string());
    file.sync.remote_tmp.get_or_insert_with(|| DEFAULT_REMOTE_TMP.to_string());
    file
}

/// Run the init command
pub fn run_init(cwd: &Path, target: &Path, args: &RemoteArgs, force: bool) -> Result<()> {
    let path = NormalizedPath::new(cwd.join(target));
    if path.exists() && !force {
        return Err(CliError::user(format!(
            "{} already exists; pass --force to overwrite",
            path
        )));
    }

    let file = initial_config(args);
    ConfigStore::new().save(&path, &file)?;

    println!("{} Wrote {}", "OK".green().bold(), path.as_str().cyan());
    if file.remote.executor == Some(ExecutorKind::Gcloud) && file.remote.host.is_none() {
        println!(
            "   set {} or add {} before syncing",
            "TPU_NAME/TPU_ZONE/PROJECT_ID".cyan(),
            "[remote] host, zone, project".cyan()
        );
    }
    Ok(())
}
