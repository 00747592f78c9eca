//! Verify an exported chain.

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use powchain_chain::ChainExport;
use powchain_consensus::BlockValidator;
use std::path::PathBuf;

#[derive(Args)]
pub struct VerifyArgs {
    /// Exported chain JSON file
    path: PathBuf,
}

pub fn run(args: VerifyArgs) -> Result<()> {
    let export = ChainExport::load(&args.path)
        .with_context(|| format!("Failed to load chain from {}", args.path.display()))?;

    println!();
    println!("{}", "Chain:".bold().cyan());
    println!("  Blocks:     {}", export.length.to_string().bright_cyan());
    println!(
        "  Difficulty: {}",
        export.difficulty.to_string().bright_cyan()
    );
    println!("  Version:    {}", export.version.bright_black());
    println!();

    match BlockValidator::validate_chain(&export.blocks) {
        Ok(()) => {
            println!("{}  Chain is valid", "✓".green().bold());
            Ok(())
        }
        Err(err) => {
            println!("{}  {}", "✗".red().bold(), err.to_string().red());
            bail!("chain in {} is invalid", args.path.display())
        }
    }
}
