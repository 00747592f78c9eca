//! Run a full simulation: generate data, mine it, validate and export.

use crate::commands::short;
use crate::datagen;
use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use colored::Colorize;
use powchain_chain::{
    Blockchain, BlockchainConfig, Ledger, Mempool, MiningSession, SessionConfig, SessionReport,
};
use powchain_core::{Miner, DEFAULT_VERSION};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LedgerModel {
    Account,
    Utxo,
}

#[derive(Args)]
pub struct SimulateArgs {
    /// Ledger model to simulate
    #[arg(short, long, value_enum, default_value = "account")]
    mode: LedgerModel,

    /// Number of generated users
    #[arg(short, long, default_value = "1000")]
    users: usize,

    /// Number of generated transactions
    #[arg(short, long, default_value = "10000")]
    transactions: usize,

    /// Number of competing miners, taken from the first users
    #[arg(long, default_value = "5")]
    miners: usize,

    /// Required leading zero hex characters
    #[arg(short, long, default_value = "3")]
    difficulty: u32,

    /// Version stamped on every block
    #[arg(long, default_value = DEFAULT_VERSION)]
    block_version: String,

    /// Pooled transactions sampled per candidate block
    #[arg(short, long, default_value = "100")]
    batch_size: usize,

    /// Initial per-round time budget in milliseconds
    #[arg(long, default_value = "500")]
    budget_ms: u64,

    /// Cap for the doubled budget in milliseconds
    #[arg(long, default_value = "60000")]
    max_budget_ms: u64,

    /// Stop after this many rounds
    #[arg(long, default_value = "1000")]
    max_rounds: usize,

    /// Mine at least this many blocks even once the pool is empty
    #[arg(long, default_value = "0")]
    blocks: usize,

    /// Seed for data generation and pool sampling
    #[arg(short, long)]
    seed: Option<u64>,

    /// Write the finished chain to this JSON file
    #[arg(short, long)]
    out: Option<PathBuf>,
}

pub fn run(args: SimulateArgs) -> Result<()> {
    if args.miners == 0 {
        bail!("at least one miner is required");
    }
    if args.miners > args.users {
        bail!(
            "cannot pick {} miners from {} users",
            args.miners,
            args.users
        );
    }

    tracing::info!(
        mode = ?args.mode,
        users = args.users,
        transactions = args.transactions,
        seed = ?args.seed,
        "starting simulation"
    );
    println!("{}", "Generating data...".bold().cyan());
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let users = datagen::generate_users(args.users, &mut rng);
    let miners: Vec<Miner> = users[..args.miners].iter().map(datagen::User::as_miner).collect();

    let (ledger, transactions) = match args.mode {
        LedgerModel::Account => {
            let txs = datagen::generate_transfers(&users, args.transactions, &mut rng);
            (Ledger::Account(datagen::balances(&users)), txs)
        }
        LedgerModel::Utxo => {
            let (utxos, txs) = datagen::generate_utxo_economy(&users, args.transactions, &mut rng);
            (Ledger::Utxo(utxos), txs)
        }
    };

    let mut pool = Mempool::new();
    let pooled = pool.extend(transactions);
    println!(
        "{}  Users: {}  |  Transactions: {}  |  Ledger: {}",
        "✓".green().bold(),
        args.users.to_string().bright_cyan(),
        pooled.to_string().bright_cyan(),
        ledger.model_name().bright_cyan()
    );

    let config = BlockchainConfig {
        difficulty: args.difficulty,
        version: args.block_version,
        batch_size: args.batch_size,
        seed: args.seed,
        ..BlockchainConfig::default()
    };
    let mut chain = Blockchain::new(config, ledger);
    let genesis = chain.ensure_genesis().hash.unwrap_or_default();
    println!(
        "{}  Created genesis block {}",
        "✓".green().bold(),
        short(&genesis.to_hex(), 16).bright_yellow()
    );

    println!();
    println!(
        "{}",
        format!("Mining with {} miners at difficulty {}...", miners.len(), args.difficulty)
            .bold()
            .cyan()
    );
    let started = Instant::now();
    let session = SessionConfig {
        initial_budget: Duration::from_millis(args.budget_ms),
        max_budget: Duration::from_millis(args.max_budget_ms),
        max_rounds: args.max_rounds,
        target_blocks: args.blocks,
    };
    let report = MiningSession::new(&mut chain, session)
        .run(&mut pool, &miners)
        .context("Mining session failed")?;

    print_report(&report, started.elapsed(), pool.len());
    print_tail(&chain, 3);

    let valid = chain.is_valid_chain();
    println!(
        "Final chain check: {}",
        if valid {
            "valid".green().bold()
        } else {
            "invalid".red().bold()
        }
    );

    if let Some(path) = args.out {
        chain
            .export()
            .save(&path)
            .with_context(|| format!("Failed to write chain to {}", path.display()))?;
        println!(
            "{}  Saved chain to: {}",
            "✓".green().bold(),
            path.display().to_string().bright_black()
        );
    }

    if !valid {
        bail!("mined chain failed validation");
    }
    Ok(())
}

fn print_report(report: &SessionReport, elapsed: Duration, pool_left: usize) {
    println!();
    println!("{}", "Session summary:".bold().cyan());
    println!("  Rounds:       {}", report.rounds.to_string().bright_cyan());
    println!(
        "  Blocks mined: {}",
        report.blocks_mined.to_string().bright_cyan()
    );
    println!("  Timeouts:     {}", report.timeouts.to_string().bright_black());
    println!("  Rejected:     {}", report.rejected.to_string().bright_black());
    println!("  Dropped txs:  {}", report.dropped.to_string().bright_black());
    println!("  Left in pool: {}", pool_left.to_string().bright_black());
    println!(
        "  Final budget: {}",
        format!("{}ms", report.final_budget.as_millis()).bright_black()
    );
    println!(
        "  Elapsed:      {}",
        format!("{:.2}s", elapsed.as_secs_f64()).bright_black()
    );
    if report.purged {
        println!(
            "  {}",
            "Pool purged: nothing left in it could be mined".yellow()
        );
    }
    println!();
}

fn print_tail(chain: &Blockchain, count: usize) {
    println!("{}", "Last blocks:".bold());
    let start = chain.len().saturating_sub(count);
    for block in &chain.blocks()[start..] {
        let hash = block.hash.unwrap_or_default().to_hex();
        println!(
            "  {} {} {} {}",
            format!("#{}", block.index).bright_black(),
            short(&hash, 16).bright_yellow(),
            format!("({} txs)", block.tx_count()).bright_black(),
            format!("nonce={}", block.header.nonce).bright_black()
        );
    }
    println!();
}
