//! TPU VM executor backed by the `gcloud` CLI

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::Result;
use crate::executor::{CommandOutput, RemoteExecutor, run_process};

/// Identifies one TPU VM (or all workers of a pod slice)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcloudTarget {
    /// TPU VM name
    pub vm: String,
    pub zone: String,
    pub project: String,
    /// Worker index, or `all`
    pub worker: String,
}

/// Runs commands through `gcloud compute tpus tpu-vm ssh` and copies files
/// through `gcloud compute tpus tpu-vm scp`.
#[derive(Debug, Clone)]
pub struct GcloudExecutor {
    target: GcloudTarget,
    program: PathBuf,
}

impl GcloudExecutor {
    pub fn new(target: GcloudTarget) -> Self {
        Self {
            target,
            program: PathBuf::from("gcloud"),
        }
    }

    /// Use a specific `gcloud` binary instead of the one on `PATH`.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn target(&self) -> &GcloudTarget {
        &self.target
    }

    fn scope_args(&self) -> Vec<OsString> {
        vec![
            format!("--zone={}", self.target.zone).into(),
            format!("--project={}", self.target.project).into(),
            format!("--worker={}", self.target.worker).into(),
        ]
    }

    /// Arguments passed to `gcloud` for a remote command.
    pub fn ssh_args(&self, command: &str) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["compute", "tpus", "tpu-vm", "ssh"]
            .into_iter()
            .map(OsString::from)
            .collect();
        args.push(self.target.vm.clone().into());
        args.extend(self.scope_args());
        args.push(format!("--command={}", command).into());
        args
    }

    /// Arguments passed to `gcloud` for a copy between `source` and `dest`.
    pub fn scp_args(&self, source: OsString, dest: OsString, recursive: bool) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["compute", "tpus", "tpu-vm", "scp"]
            .into_iter()
            .map(OsString::from)
            .collect();
        if recursive {
            args.push("--recurse".into());
        }
        args.push(source);
        args.push(dest);
        args.extend(self.scope_args());
        args
    }

    fn remote_spec(&self, path: &str) -> OsString {
        format!("{}:{}", self.target.vm, path).into()
    }

    fn invoke(&self, args: Vec<OsString>, display: &str) -> Result<CommandOutput> {
        let mut cmd = Command::new(&self.program);
        cmd.args(args);
        run_process(&mut cmd, &self.program.to_string_lossy(), display)
    }
}

impl RemoteExecutor for GcloudExecutor {
    fn run(&self, command: &str) -> Result<CommandOutput> {
        self.invoke(self.ssh_args(command), command)
    }

    fn copy_to(&self, local: &Path, remote: &str, recursive: bool) -> Result<()> {
        let display = format!("scp {} -> {}:{}", local.display(), self.target.vm, remote);
        let args = self.scp_args(local.as_os_str().to_owned(), self.remote_spec(remote), recursive);
        self.invoke(args, &display).map(|_| ())
    }

    fn copy_from(&self, remote: &str, local: &Path, recursive: bool) -> Result<()> {
        let display = format!("scp {}:{} -> {}", self.target.vm, remote, local.display());
        let args = self.scp_args(self.remote_spec(remote), local.as_os_str().to_owned(), recursive);
        self.invoke(args, &display).map(|_| ())
    }

    fn describe(&self) -> String {
        format!("{} ({}, worker {})", self.target.vm, self.target.zone, self.target.worker)
    }
}
