//! Shell completions command implementation.

use crate::cli::{Cli, Shell};
use crate::error::Result;
use clap::CommandFactory;
use clap_complete::{generate, shells};
use std::io::{self, Write};

const BIN_NAME: &str = "chroma-embed";

/// Generate shell completions for the specified shell.
///
/// # Errors
///
/// Returns an I/O error if stdout cannot be flushed.
pub fn execute(shell: &Shell) -> Result<()> {
    let mut out = io::stdout().lock();
    write_completions(shell, &mut out);
    out.flush()?;
    Ok(())
}

/// Write the completion script for `shell` to `out`.
pub fn write_completions(shell: &Shell, out: &mut impl Write) {
    let mut cmd = Cli::command();
    match shell {
        Shell::Bash => generate(shells::Bash, &mut cmd, BIN_NAME, out),
        Shell::Zsh => generate(shells::Zsh, &mut cmd, BIN_NAME, out),
        Shell::Fish => generate(shells::Fish, &mut cmd, BIN_NAME, out),
        Shell::PowerShell => generate(shells::PowerShell, &mut cmd, BIN_NAME, out),
        Shell::Elvish => generate(shells::Elvish, &mut cmd, BIN_NAME, out),
    }
}
