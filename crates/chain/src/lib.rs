//! Blockchain orchestration for powchain.
//!
//! This crate brings the core types and consensus rules together into a
//! running chain:
//! - **Blockchain**: mining rounds, verification, append and settlement
//! - **Mempool**: transaction pool for pending transactions
//! - **Executor**: applies accepted blocks to the account or UTXO ledger
//! - **Session**: repeated rounds with time-budget back-off
//! - **Export**: JSON snapshot of the chain
//! - **Tamper**: corrupt a copy of the chain and confirm validation notices
//!
//! # Example
//!
//! ```rust,no_run
//! use powchain_chain::{Blockchain, BlockchainConfig, Ledger, Mempool};
//! use powchain_core::{AccountTransaction, Balances, Miner};
//! use std::time::Duration;
//!
//! let balances: Balances = [("alice", 100), ("bob", 0)].into_iter().collect();
//! let mut chain = Blockchain::new(BlockchainConfig::default(), Ledger::Account(balances));
//!
//! let mut pool = Mempool::new();
//! pool.add(AccountTransaction::new("alice", "bob", 30).into()).unwrap();
//!
//! let miners = vec![Miner::new("Miner1", "miner-1"), Miner::new("Miner2", "miner-2")];
//! let outcome = chain.mine_round(&mut pool, &miners, Duration::from_secs(5)).unwrap();
//! assert!(outcome.is_mined());
//! assert!(chain.is_valid_chain());
//! ```

pub mod blockchain;
pub mod executor;
pub mod export;
pub mod mempool;
pub mod session;
pub mod tamper;

// Re-export commonly used types
pub use blockchain::{
    Blockchain, BlockchainConfig, BlockchainError, BlockchainStats, MinedRound, RoundOutcome,
};
pub use executor::{ApplyReport, Executor, Ledger, TransactionReceipt};
pub use export::ChainExport;
pub use mempool::{Mempool, MempoolConfig, MempoolError, MempoolStats};
pub use session::{MiningSession, SessionConfig, SessionReport};
pub use tamper::{Tamper, TamperCheck};
