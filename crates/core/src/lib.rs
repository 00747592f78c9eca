//! Core blockchain primitives for powchain.
//!
//! This crate provides the fundamental types used throughout the blockchain:
//! - Hashing and hex digests
//! - Merkle roots
//! - Account and UTXO transactions
//! - Ledger state for both models (balances, unspent outputs)
//! - Blocks and block headers
//! - Miner identity

pub mod account;
pub mod block;
pub mod hash;
pub mod merkle;
pub mod miner;
pub mod transaction;
pub mod utxo;

use std::time::{SystemTime, UNIX_EPOCH};

// Re-export commonly used types at the crate root
pub use account::{BalanceError, Balances};
pub use block::{Block, BlockHeader, DEFAULT_VERSION};
pub use hash::{hash, hash_concat, Hash, H256};
pub use merkle::merkle_root;
pub use miner::Miner;
pub use transaction::{AccountTransaction, OutPoint, Transaction, TxOut, UtxoTransaction};
pub use utxo::UtxoSet;

/// Get the current Unix timestamp in seconds.
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
