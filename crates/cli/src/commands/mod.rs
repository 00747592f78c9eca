//! CLI commands module.

use anyhow::Result;
use clap::Subcommand;

mod show;
mod simulate;
mod tamper;
mod verify;

#[derive(Subcommand)]
pub enum Commands {
    /// Generate users and transactions, then mine them into a chain
    Simulate(simulate::SimulateArgs),
    /// Reload an exported chain and validate it
    Verify(verify::VerifyArgs),
    /// Corrupt copies of a chain and check each change is detected
    Tamper(tamper::TamperArgs),
    /// Print blocks from an exported chain
    Show(show::ShowArgs),
}

pub fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Simulate(args) => simulate::run(args),
        Commands::Verify(args) => verify::run(args),
        Commands::Tamper(args) => tamper::run(args),
        Commands::Show(args) => show::run(args),
    }
}

/// Leading `len` bytes of an identifier, or all of it when shorter.
pub(crate) fn short(id: &str, len: usize) -> &str {
    id.get(..len).unwrap_or(id)
}
