//! devsync CLI
//!
//! Keeps a remote TPU VM's staging directory and container mount in step
//! with a local source tree.

mod cli;
mod commands;
mod config;
mod error;
mod interactive;

use clap::{CommandFactory, Parser};
use colored::Colorize;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use cli::{Cli, Commands};
use config::Settings;
use error::Result;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(e.exit_code());
    }
}

/// `RUST_LOG` wins; otherwise debug with `--verbose` and warnings only
/// without. Logs go to stderr so `--json` output stays clean.
fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to install log subscriber: {e}");
    }
    tracing::debug!("verbose mode enabled");
}

fn run(cli: Cli) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let Some(command) = cli.command else {
        println!("{} keep remote code in step with local", "devsync".green().bold());
        println!();
        println!("Run {} for available commands.", "devsync --help".cyan());
        return Ok(());
    };

    let settings = || Settings::load(&cwd, cli.config.as_deref(), &cli.remote);

    match command {
        Commands::Sync(args) => commands::run_sync(&settings()?, &args),
        Commands::Plan { targets, json } => commands::run_plan(&settings()?, &targets, json),
        Commands::Restart => commands::run_restart(&settings()?),
        Commands::Prune => commands::run_prune(&settings()?),
        Commands::Config { json } => commands::run_config_show(&settings()?, json),
        Commands::Init { path, force } => commands::run_init(&cwd, &path, &cli.remote, force),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "devsync", &mut std::io::stdout());
            Ok(())
        }
    }
}
