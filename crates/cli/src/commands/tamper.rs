//! Tamper detection harness.

use crate::datagen;
use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use powchain_chain::tamper::{self, TamperCheck};
use powchain_chain::{Blockchain, BlockchainConfig, ChainExport, Ledger, Mempool, RoundOutcome};
use powchain_core::{Block, Miner};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Args)]
pub struct TamperArgs {
    /// Exported chain JSON file. A small demo chain is mined when omitted.
    path: Option<PathBuf>,

    /// Block to tamper with (genesis is trusted and cannot be targeted)
    #[arg(short, long, default_value = "1")]
    block: usize,

    /// Difficulty of the demo chain
    #[arg(short, long, default_value = "3")]
    difficulty: u32,

    /// Seed for the demo chain
    #[arg(short, long)]
    seed: Option<u64>,
}

pub fn run(args: TamperArgs) -> Result<()> {
    let blocks = match &args.path {
        Some(path) => {
            let export = ChainExport::load(path)
                .with_context(|| format!("Failed to load chain from {}", path.display()))?;
            println!(
                "{}  Loaded chain with {} blocks",
                "✓".green().bold(),
                export.length
            );
            export.blocks
        }
        None => {
            println!("No chain file given, mining a quick demo chain...");
            demo_chain(args.difficulty, args.seed)?
        }
    };

    if args.block == 0 {
        bail!("genesis is trusted by construction and cannot be tampered with");
    }
    if args.block >= blocks.len() {
        bail!(
            "block {} does not exist (chain has {} blocks)",
            args.block,
            blocks.len()
        );
    }

    println!();
    println!(
        "{}",
        format!("Running tamper tests on block #{}...", args.block)
            .bold()
            .cyan()
    );

    let checks = tamper::check_all(&blocks, args.block);
    for check in &checks {
        print_check(check);
    }

    let missed = checks.iter().filter(|c| !c.detected()).count();
    println!();
    if missed > 0 {
        bail!("{} tamper(s) went undetected", missed);
    }
    println!("{}", "Tamper detection working as expected.".green().bold());
    Ok(())
}

fn print_check(check: &TamperCheck) {
    match &check.error {
        Some(err) => println!(
            "  {}  {:<14} {}",
            "✓".green().bold(),
            check.tamper.name(),
            err.to_string().bright_black()
        ),
        None => println!(
            "  {}  {:<14} {}",
            "✗".red().bold(),
            check.tamper.name(),
            "not detected".red()
        ),
    }
}

/// Mine one block of random transfers on top of genesis.
fn demo_chain(difficulty: u32, seed: Option<u64>) -> Result<Vec<Block>> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let users = datagen::generate_users(5, &mut rng);
    let miners: Vec<Miner> = users[..3].iter().map(datagen::User::as_miner).collect();

    let mut pool = Mempool::new();
    pool.extend(datagen::generate_transfers(&users, 20, &mut rng));

    let config = BlockchainConfig {
        difficulty,
        version: "v0.2".into(),
        seed,
        ..BlockchainConfig::default()
    };
    let mut chain = Blockchain::new(config, Ledger::Account(datagen::balances(&users)));

    match chain.mine_round(&mut pool, &miners, Duration::from_secs(120))? {
        RoundOutcome::Mined(round) => {
            println!(
                "{}  Mined block #{} with {} txs",
                "✓".green().bold(),
                round.index,
                round.tx_count
            );
            Ok(chain.blocks().to_vec())
        }
        outcome => bail!("demo chain could not be mined: {:?}", outcome),
    }
}
