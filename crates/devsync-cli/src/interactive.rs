//! Interactive prompts for CLI commands
//!
//! Uses dialoguer for the deletion confirmation.

use std::io::IsTerminal;

use colored::Colorize;
use devsync_core::Confirm;

/// Asks on the terminal. Without a terminal every prompt is declined, so
/// unattended runs never delete unless `--yes` was given.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalConfirm;

impl Confirm for TerminalConfirm {
    fn confirm(&self, prompt: &str) -> devsync_core::Result<bool> {
        if !std::io::stdin().is_terminal() {
            eprintln!(
                "{} {} (no terminal to ask on; pass {} to allow)",
                "skip".yellow().bold(),
                prompt,
                "--yes".cyan()
            );
            return Ok(false);
        }

        dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .map_err(|e| devsync_core::Error::io("terminal", std::io::Error::other(e.to_string())))
    }
}
