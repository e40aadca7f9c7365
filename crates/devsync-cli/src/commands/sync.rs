//! Sync and plan command implementations

use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use devsync_core::watch::{EngineCycle, WatchScheduler, WatchSession, start_watching, stop_channel};
use devsync_core::{AssumeYes, Confirm, CycleOutcome, CycleReport, DenyAll, PathResolver, SyncConfig, SyncEngine, SyncMode};
use devsync_fs::SessionLock;

use crate::cli::{SyncArgs, TargetArgs};
use crate::config::Settings;
use crate::error::{CliError, Result};
use crate::interactive::TerminalConfirm;

/// Turn the target flags into a sync mode. Targets are checked against the
/// local tree here, before anything talks to the remote host.
pub fn build_mode(config: &SyncConfig, targets: &TargetArgs) -> Result<SyncMode> {
    if targets.is_full() {
        return Ok(SyncMode::Full);
    }
    let resolver = PathResolver::new(config);
    let mut resolved = Vec::with_capacity(targets.files.len() + targets.dir.len());
    for file in &targets.files {
        resolved.push(resolver.file_target(file)?);
    }
    for dir in &targets.dir {
        resolved.push(resolver.dir_target(dir)?);
    }
    Ok(SyncMode::Selective(resolved))
}

/// Run the sync command
pub fn run_sync(settings: &Settings, args: &SyncArgs) -> Result<()> {
    let confirm: Arc<dyn Confirm> = if args.yes {
        Arc::new(AssumeYes)
    } else {
        Arc::new(TerminalConfirm)
    };
    let engine = SyncEngine::new(settings.sync.clone(), settings.build_executor(), confirm)?;
    let mut mode = build_mode(engine.config(), &args.targets)?;
    if args.dry_run {
        mode = SyncMode::dry_run(mode);
    }

    if args.prune && !args.dry_run {
        let summary = engine.runtime().prune()?;
        println!("{} Pruned container storage on {}", "OK".green().bold(), settings.host().cyan());
        if !summary.is_empty() {
            println!("{}", summary.dimmed());
        }
    }

    if args.watch {
        return run_watch(settings, engine, mode, args);
    }

    let _lock = if mode.is_dry_run() {
        None
    } else {
        Some(SessionLock::acquire(&settings.sync.lock_key(&settings.host()))?)
    };

    if !args.json {
        println!(
            "{} Syncing {} to {} ({})",
            "=>".blue().bold(),
            settings.sync.local_root.display().to_string().cyan(),
            settings.host().cyan(),
            mode.label()
        );
    }

    let report = engine.run_cycle(&mode)?;
    print_report(&report, args.json)?;

    if args.restart && !report.dry_run && report.outcome() == CycleOutcome::Success {
        engine.runtime().restart()?;
        if !args.json {
            println!("{} Restarted container", "OK".green().bold());
        }
    }

    finish(&report)
}

/// Run the plan command: a dry run that never prompts.
pub fn run_plan(settings: &Settings, targets: &TargetArgs, json: bool) -> Result<()> {
    let engine = SyncEngine::new(settings.sync.clone(), settings.build_executor(), Arc::new(DenyAll))?;
    let mode = SyncMode::dry_run(build_mode(engine.config(), targets)?);
    let report = engine.run_cycle(&mode)?;
    print_report(&report, json)
}

fn run_watch(settings: &Settings, engine: SyncEngine, mode: SyncMode, args: &SyncArgs) -> Result<()> {
    let _lock = SessionLock::acquire(&settings.sync.lock_key(&settings.host()))?;
    let session = WatchSession::new(&settings.sync.local_root)
        .with_debounce(Duration::from_millis(args.debounce_ms))
        .with_restart_after_sync(args.restart);
    let poll_interval = Duration::from_secs(args.poll_interval_secs);
    let prefer_polling = args.poll;

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    let stats = runtime.block_on(async move {
        let (watcher, events) = start_watching(session.root(), prefer_polling, poll_interval)?;
        let (stop, stop_rx) = stop_channel();

        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("{} stopping after the current cycle", "=>".blue().bold());
                stop.stop();
            }
        });

        println!(
            "{} Watching {} ({}), press Ctrl-C to stop",
            "=>".blue().bold(),
            session.root().display().to_string().cyan(),
            watcher.name()
        );
        let stats = WatchScheduler::new(session, Arc::new(EngineCycle::new(engine, mode)))
            .run(events, stop_rx)
            .await?;
        Ok::<_, CliError>(stats)
    })?;

    println!(
        "{} Watch ended after {} cycle(s), {} failed, {} partial",
        "OK".green().bold(),
        stats.cycles,
        stats.failures,
        stats.partial
    );
    Ok(())
}

fn print_report(report: &CycleReport, json: bool) -> Result<()> {
    if json {
        let output = serde_json::to_string_pretty(report).map_err(|e| CliError::user(e.to_string()))?;
        println!("{output}");
        return Ok(());
    }

    let plan = &report.plan;
    if report.dry_run {
        println!(
            "{} {} to transfer, {} to delete, {} unchanged",
            "PLAN".cyan().bold(),
            plan.to_transfer.len(),
            plan.to_delete.len(),
            plan.unchanged.len()
        );
        for path in &plan.to_transfer {
            println!("   {} {}", "+".green(), path);
        }
        for path in &plan.to_delete {
            println!("   {} {}", "-".red(), path);
        }
        return Ok(());
    }

    if let Some(transfer) = &report.transfer {
        for failure in &transfer.failures {
            println!("   {} {}", "!".red(), failure);
        }
    }
    if let Some(deletion) = &report.deletion {
        if deletion.denied {
            println!("   {} deletion of {} file(s) declined", "-".yellow(), plan.to_delete.len());
        }
        for entry in &deletion.refused {
            println!("   {} refused to delete {} (exists {})", "!".yellow(), entry.path, entry.origin);
        }
        for failure in &deletion.failures {
            println!("   {} delete {} {}: {}", "!".red(), failure.location, failure.root, failure.message);
        }
    }

    let label = match report.outcome() {
        CycleOutcome::Success => "OK".green().bold(),
        CycleOutcome::PartialFailure => "PARTIAL".yellow().bold(),
    };
    println!(
        "{} {} transferred, {} deleted, {} failed",
        label,
        report.transferred(),
        report.deleted(),
        report.failed()
    );
    Ok(())
}

fn finish(report: &CycleReport) -> Result<()> {
    match report.outcome() {
        CycleOutcome::Success => Ok(()),
        CycleOutcome::PartialFailure => Err(CliError::PartialFailure {
            failed: report.failed(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devsync_core::{Error, Target};
    use devsync_fs::RelativePath;
    use devsync_test_utils::TestTree;
    use std::path::PathBuf;

    #[test]
    fn no_targets_is_full_mode() {
        let tree = TestTree::new();
        let mode = build_mode(&SyncConfig::new(tree.root()), &TargetArgs::default()).unwrap();
        assert_eq!(mode, SyncMode::Full);
    }

    #[test]
    fn files_and_dirs_become_selective_targets() {
        let tree = TestTree::new().with_file("a.py", "").with_file("models/b.py", "");
        let targets = TargetArgs {
            files: vec![PathBuf::from("a.py")],
            dir: vec![PathBuf::from("models")],
            all: false,
        };
        let mode = build_mode(&SyncConfig::new(tree.root()), &targets).unwrap();
        assert_eq!(
            mode,
            SyncMode::Selective(vec![
                Target::File(RelativePath::new("a.py").unwrap()),
                Target::Dir(RelativePath::new("models").unwrap()),
            ])
        );
    }

    #[test]
    fn missing_file_target_fails_before_remote() {
        let tree = TestTree::new();
        let targets = TargetArgs {
            files: vec![PathBuf::from("b.py")],
            ..TargetArgs::default()
        };
        let err = build_mode(&SyncConfig::new(tree.root()), &targets).unwrap_err();
        assert!(matches!(err, CliError::Core(Error::InvalidTarget { .. })));
    }
}
