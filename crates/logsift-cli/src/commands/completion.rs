use anyhow::{Context, Result};
use clap::Command;
use clap_complete::{Shell, generate};
use std::io::{self, Write};

/// Print the completion script for the `logsift` binary
///
/// The script completes the `report`, `stats` and `completion` subcommands
/// along with their flags, including the `--sort-by` metric names.
pub fn execute(shell: Shell, cmd: &mut Command) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_script(shell, cmd, &mut out)?;
    out.flush().context("Failed to flush completion script")?;
    Ok(())
}

fn write_script(shell: Shell, cmd: &mut Command, out: &mut dyn Write) -> Result<()> {
    let bin_name = cmd.get_name().to_string();
    let subcommands: Vec<&str> = cmd.get_subcommands().map(|s| s.get_name()).collect();
    tracing::debug!(
        "Generating {} completions for {} ({})",
        shell,
        bin_name,
        subcommands.join(", ")
    );
    generate(shell, cmd, bin_name, out);
    Ok(())
}
