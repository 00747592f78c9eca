//! Block explorer over an exported chain.

use crate::commands::short;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use powchain_chain::ChainExport;
use powchain_core::Block;
use std::path::PathBuf;

#[derive(Args)]
pub struct ShowArgs {
    /// Exported chain JSON file
    path: PathBuf,

    /// Show one block in detail
    #[arg(short, long)]
    block: Option<usize>,

    /// Number of recent blocks to list
    #[arg(short, long, default_value = "10")]
    count: usize,
}

pub fn run(args: ShowArgs) -> Result<()> {
    let export = ChainExport::load(&args.path)
        .with_context(|| format!("Failed to load chain from {}", args.path.display()))?;

    match args.block {
        Some(index) => {
            let block = export
                .blocks
                .get(index)
                .with_context(|| format!("Block {} not found", index))?;
            show_block(block);
        }
        None => list_blocks(&export.blocks, args.count),
    }
    Ok(())
}

fn list_blocks(blocks: &[Block], count: usize) {
    println!();
    println!("{}", "Recent Blocks:".bold().cyan());
    println!();

    let start = blocks.len().saturating_sub(count);
    for block in blocks[start..].iter().rev() {
        let hash = block.hash.unwrap_or_default().to_hex();
        println!(
            "  {} {} {}",
            format!("#{}", block.index).bright_black(),
            short(&hash, 16).bright_yellow(),
            format!("({} txs)", block.tx_count()).bright_black()
        );
    }
    println!();
}

fn show_block(block: &Block) {
    let hash = block.hash.unwrap_or_default();

    println!();
    println!("{}", "Block Information:".bold().cyan());
    println!();
    println!("  Index:        {}", block.index.to_string().bright_cyan());
    println!("  Hash:         {}", hash.to_hex().bright_yellow());
    println!(
        "  Parent Hash:  {}",
        block.header.prev_hash.to_hex().bright_black()
    );
    println!(
        "  Merkle Root:  {}",
        block.header.tx_root.to_hex().bright_black()
    );
    println!(
        "  Timestamp:    {}",
        block.header.timestamp.to_string().bright_black()
    );
    println!("  Version:      {}", block.header.version.bright_black());
    println!(
        "  Nonce:        {}",
        block.header.nonce.to_string().bright_black()
    );
    println!(
        "  Difficulty:   {}",
        block.header.difficulty.to_string().bright_black()
    );
    println!(
        "  Transactions: {}",
        block.tx_count().to_string().bright_cyan()
    );
    println!();

    if !block.transactions.is_empty() {
        println!("{}", "Transactions:".bold());
        println!();
        for (i, tx) in block.transactions.iter().enumerate() {
            println!(
                "  {} {} {}",
                format!("{}.", i + 1).bright_black(),
                short(&tx.tx_id().to_hex(), 16).bright_yellow(),
                tx
            );
        }
        println!();
    }
}
