//! Resolving settings from flags, environment and the config file
//!
//! Precedence, highest first: command-line flags, environment variables
//! (both handled by clap), the config file, built-in defaults. The result is
//! an explicit [`SyncConfig`] plus the executor to reach the remote host.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::ValueEnum;
use devsync_core::{ContainerBridge, SyncConfig};
use devsync_core::config::{DEFAULT_CONTAINER_PATH, DEFAULT_LOCAL_ROOT, DEFAULT_REMOTE_TMP, DEFAULT_STAGING_PATH};
use devsync_fs::{ConfigStore, NormalizedPath};
use devsync_remote::{GcloudExecutor, GcloudTarget, LocalExecutor, RemoteExecutor};
use serde::{Deserialize, Serialize};

use crate::cli::RemoteArgs;
use crate::error::{CliError, Result};

/// Config file picked up from the working directory
pub const DEFAULT_CONFIG_FILE: &str = ".devsync.toml";

/// Worker addressed when none is configured
pub const DEFAULT_WORKER: &str = "all";

#[derive(ValueEnum, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum BridgeKind {
    /// Stream into the container with `docker exec`
    Docker,
    /// Copy into a host-visible container mount
    HostCopy,
    /// Staging is the container mount
    None,
}

#[derive(ValueEnum, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutorKind {
    /// `gcloud compute tpus tpu-vm ssh/scp`
    Gcloud,
    /// This machine is the remote host
    Local,
}

/// On-disk configuration. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub remote: RemoteSection,
    pub sync: SyncSection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RemoteSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executor: Option<ExecutorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker: Option<String>,
    /// `gcloud` binary to use instead of the one on `PATH`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gcloud: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_root: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staging_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_tmp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bridge: Option<BridgeKind>,
    /// Prefix docker commands with `sudo` (default true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sudo: Option<bool>,
}

impl FileConfig {
    /// Overlay flags and environment on top of the file values.
    pub fn with_overrides(mut self, args: &RemoteArgs) -> Self {
        fn set<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
            if value.is_some() {
                slot.clone_from(value);
            }
        }
        set(&mut self.remote.executor, &args.executor);
        set(&mut self.remote.host, &args.host);
        set(&mut self.remote.zone, &args.zone);
        set(&mut self.remote.project, &args.project);
        set(&mut self.remote.worker, &args.worker);
        set(&mut self.sync.local_root, &args.local_root);
        set(&mut self.sync.staging_path, &args.staging_path);
        set(&mut self.sync.container_path, &args.container_path);
        set(&mut self.sync.container, &args.container);
        set(&mut self.sync.bridge, &args.bridge);
        self
    }
}

/// Fully resolved settings for one invocation
#[derive(Debug, Clone)]
pub struct Settings {
    pub executor: ExecutorKind,
    /// Set when `executor` is gcloud
    pub gcloud: Option<GcloudTarget>,
    pub gcloud_program: Option<PathBuf>,
    pub sync: SyncConfig,
    /// Config file the values were read from, if any
    pub source: Option<PathBuf>,
}

impl Settings {
    /// Load the config file (explicit path, or `.devsync.toml` in `cwd` when
    /// present), overlay `args`, and resolve.
    pub fn load(cwd: &Path, config_path: Option<&Path>, args: &RemoteArgs) -> Result<Self> {
        let store = ConfigStore::new();
        let (file, source) = match config_path {
            Some(path) => {
                let path = cwd.join(path);
                let file: FileConfig = store.load(&NormalizedPath::new(&path))?;
                (file, Some(path))
            }
            None => {
                let path = cwd.join(DEFAULT_CONFIG_FILE);
                match store.load_optional::<FileConfig>(&NormalizedPath::new(&path))? {
                    Some(file) => (file, Some(path)),
                    None => (FileConfig::default(), None),
                }
            }
        };
        tracing::debug!(source = ?source, "loaded configuration");

        let mut settings = Self::resolve(file.with_overrides(args))?;
        settings.source = source;
        Ok(settings)
    }

    /// Apply defaults and check that the combination is usable.
    pub fn resolve(file: FileConfig) -> Result<Self> {
        let executor = file.remote.executor.unwrap_or(ExecutorKind::Gcloud);

        let gcloud = match executor {
            ExecutorKind::Local => None,
            ExecutorKind::Gcloud => Some(GcloudTarget {
                vm: required(file.remote.host, "remote host", "TPU_NAME", "--host")?,
                zone: required(file.remote.zone, "zone", "TPU_ZONE", "--zone")?,
                project: required(file.remote.project, "project", "PROJECT_ID", "--project")?,
                worker: file.remote.worker.unwrap_or_else(|| DEFAULT_WORKER.to_string()),
            }),
        };

        let sudo = file.sync.sudo.unwrap_or(true);
        let bridge = match (file.sync.bridge, file.sync.container) {
            (Some(BridgeKind::Docker), Some(container)) | (None, Some(container)) => {
                ContainerBridge::DockerExec { container, sudo }
            }
            (Some(BridgeKind::Docker), None) => {
                return Err(CliError::config(
                    "docker bridge needs a container name; set DEVSYNC_CONTAINER or --container",
                ));
            }
            (Some(BridgeKind::HostCopy), _) => ContainerBridge::HostCopy,
            (Some(BridgeKind::None), _) | (None, None) => ContainerBridge::Disabled,
        };

        let sync = SyncConfig::new(file.sync.local_root.unwrap_or_else(|| PathBuf::from(DEFAULT_LOCAL_ROOT)))
            .with_staging_path(file.sync.staging_path.unwrap_or_else(|| DEFAULT_STAGING_PATH.to_string()))
            .with_container_path(file.sync.container_path.unwrap_or_else(|| DEFAULT_CONTAINER_PATH.to_string()))
            .with_remote_tmp(file.sync.remote_tmp.unwrap_or_else(|| DEFAULT_REMOTE_TMP.to_string()))
            .with_bridge(bridge);
        sync.validate()?;

        Ok(Self {
            executor,
            gcloud,
            gcloud_program: file.remote.gcloud,
            sync,
            source: None,
        })
    }

    /// Build the executor these settings point at.
    pub fn build_executor(&self) -> Arc<dyn RemoteExecutor> {
        match &self.gcloud {
            Some(target) => {
                let mut executor = GcloudExecutor::new(target.clone());
                if let Some(program) = &self.gcloud_program {
                    executor = executor.with_program(program);
                }
                Arc::new(executor)
            }
            None => Arc::new(LocalExecutor::new()),
        }
    }

    /// Name of the remote host, for messages and the session lock.
    pub fn host(&self) -> String {
        match &self.gcloud {
            Some(target) => format!("{}/{}", target.project, target.vm),
            None => "localhost".to_string(),
        }
    }
}

fn required(value: Option<String>, what: &str, env: &str, flag: &str) -> Result<String> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(CliError::config(format!("missing {what}; set {env} or pass {flag}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn gcloud_args() -> RemoteArgs {
        RemoteArgs {
            host: Some("tpu-a".into()),
            zone: Some("us-central2-b".into()),
            project: Some("research".into()),
            ..RemoteArgs::default()
        }
    }

    #[test]
    fn defaults_apply_without_file() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load(dir.path(), None, &gcloud_args()).unwrap();

        let target = settings.gcloud.as_ref().unwrap();
        assert_eq!(target.worker, "all");
        assert_eq!(settings.sync.staging_path, "~/src");
        assert_eq!(settings.sync.container_path, "/app/src");
        assert_eq!(settings.sync.bridge, ContainerBridge::Disabled);
        assert!(settings.source.is_none());
    }

    #[test]
    fn gcloud_requires_host_zone_and_project() {
        let err = Settings::resolve(FileConfig::default()).unwrap_err();
        assert!(err.to_string().contains("TPU_NAME"));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn local_executor_needs_no_host() {
        let mut file = FileConfig::default();
        file.remote.executor = Some(ExecutorKind::Local);
        let settings = Settings::resolve(file).unwrap();
        assert!(settings.gcloud.is_none());
        assert_eq!(settings.host(), "localhost");
    }

    #[test]
    fn flags_override_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(DEFAULT_CONFIG_FILE),
            "[remote]\nhost = \"from-file\"\nzone = \"z\"\nproject = \"p\"\n\n[sync]\nstaging_path = \"~/code\"\n",
        )
        .unwrap();

        let args = RemoteArgs {
            host: Some("from-flag".into()),
            ..RemoteArgs::default()
        };
        let settings = Settings::load(dir.path(), None, &args).unwrap();
        assert_eq!(settings.gcloud.unwrap().vm, "from-flag");
        assert_eq!(settings.sync.staging_path, "~/code");
        assert!(settings.source.is_some());
    }

    #[test]
    fn container_name_implies_docker_bridge() {
        let mut file = FileConfig::default();
        file.remote.executor = Some(ExecutorKind::Local);
        file.sync.container = Some("trainer".into());
        let settings = Settings::resolve(file).unwrap();
        assert_eq!(
            settings.sync.bridge,
            ContainerBridge::DockerExec {
                container: "trainer".into(),
                sudo: true
            }
        );
    }

    #[test]
    fn docker_bridge_without_container_is_rejected() {
        let mut file = FileConfig::default();
        file.remote.executor = Some(ExecutorKind::Local);
        file.sync.bridge = Some(BridgeKind::Docker);
        assert!(Settings::resolve(file).is_err());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("devsync.toml");
        std::fs::write(&path, "[sync]\nstagin_path = \"~/x\"\n").unwrap();
        let err = Settings::load(dir.path(), Some(Path::new("devsync.toml")), &gcloud_args()).unwrap_err();
        assert!(matches!(err, CliError::Fs(_)));
    }
}
