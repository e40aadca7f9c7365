//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use crate::config::{BridgeKind, ExecutorKind};

/// devsync - keep a remote TPU VM and its container in step with local code
#[derive(Parser, Debug)]
#[command(name = "devsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (.toml, .json, .yaml); defaults to ./.devsync.toml when present
    #[arg(long, global = true, env = "DEVSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub remote: RemoteArgs,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Where to sync to. Every option falls back to the config file, then to
/// built-in defaults.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteArgs {
    /// TPU VM name
    #[arg(long, global = true, env = "TPU_NAME")]
    pub host: Option<String>,

    /// Zone of the TPU VM
    #[arg(long, global = true, env = "TPU_ZONE")]
    pub zone: Option<String>,

    /// Google Cloud project
    #[arg(long, global = true, env = "PROJECT_ID")]
    pub project: Option<String>,

    /// Worker index, or `all`
    #[arg(long, global = true, env = "TPU_WORKER")]
    pub worker: Option<String>,

    /// Local source tree
    #[arg(long, global = true, env = "DEVSYNC_LOCAL_ROOT")]
    pub local_root: Option<PathBuf>,

    /// Staging directory on the remote host
    #[arg(long, global = true, env = "DEVSYNC_STAGING_PATH")]
    pub staging_path: Option<String>,

    /// Mount point inside the container
    #[arg(long, global = true, env = "DEVSYNC_CONTAINER_PATH")]
    pub container_path: Option<String>,

    /// Container to bridge into and restart
    #[arg(long, global = true, env = "DEVSYNC_CONTAINER")]
    pub container: Option<String>,

    /// How files reach the container
    #[arg(long, global = true, value_enum, env = "DEVSYNC_BRIDGE")]
    pub bridge: Option<BridgeKind>,

    /// How remote commands are run
    #[arg(long, global = true, value_enum, env = "DEVSYNC_EXECUTOR")]
    pub executor: Option<ExecutorKind>,
}

/// Which files a sync or plan covers
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetArgs {
    /// Files to sync, relative to the local root
    #[arg(conflicts_with_all = ["all", "dir"])]
    pub files: Vec<PathBuf>,

    /// Sync every file and remove remote leftovers (the default)
    #[arg(long, conflicts_with = "dir")]
    pub all: bool,

    /// Sync every file under a directory; repeatable
    #[arg(long, value_name = "PATH")]
    pub dir: Vec<PathBuf>,
}

impl TargetArgs {
    /// True when no explicit target was named.
    pub fn is_full(&self) -> bool {
        self.files.is_empty() && self.dir.is_empty()
    }
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct SyncArgs {
    #[command(flatten)]
    pub targets: TargetArgs,

    /// Keep watching the local tree and re-sync on change. Watching starts
    /// with a full sync; later cycles sync the given targets.
    #[arg(long)]
    pub watch: bool,

    /// Restart the container after each sync
    #[arg(long)]
    pub restart: bool,

    /// Watch by polling instead of native notifications
    #[arg(long, requires = "watch")]
    pub poll: bool,

    /// Quiet period before a watch cycle runs
    #[arg(long, default_value_t = 500, value_name = "MS")]
    pub debounce_ms: u64,

    /// Snapshot interval of the polling watcher
    #[arg(long, default_value_t = 5, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_interval_secs: u64,

    /// Print the plan without changing anything
    #[arg(long, conflicts_with = "watch")]
    pub dry_run: bool,

    /// Reclaim container storage on the remote host before syncing
    #[arg(long)]
    pub prune: bool,

    /// Delete remote leftovers without asking
    #[arg(short, long)]
    pub yes: bool,

    /// Output the report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Synchronize the local tree to the remote staging directory and container
    ///
    /// Examples:
    ///   devsync sync                      # everything, removing remote leftovers
    ///   devsync sync models/bert.py       # one file, nothing removed
    ///   devsync sync --dir models         # one directory
    ///   devsync sync --watch --restart    # keep syncing, restart container each time
    Sync(SyncArgs),

    /// Show what a sync would transfer and delete
    Plan {
        #[command(flatten)]
        targets: TargetArgs,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Restart the container
    Restart,

    /// Reclaim unused container storage on the remote host
    Prune,

    /// Show the resolved configuration
    Config {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Write the resolved configuration to a config file
    Init {
        /// Where to write it
        #[arg(default_value = ".devsync.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Generate shell completions
    ///
    /// Examples:
    ///   devsync completions bash > ~/.local/share/bash-completion/completions/devsync
    ///   devsync completions zsh > ~/.zfunc/_devsync
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
