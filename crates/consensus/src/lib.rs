//! Proof of Work consensus for powchain.
//!
//! This crate provides:
//! - Single-worker PoW search and a multi-worker mining race with a deadline
//! - Speculative transaction validation for the account and UTXO models
//! - Block validation (links, proof of work, merkle roots, transaction ids)
//!   and full-chain validation
//!
//! # Example
//!
//! ```rust
//! use powchain_consensus::{mine, BlockValidator};
//! use powchain_core::Block;
//!
//! let genesis = Block::genesis("v0.1", 2);
//! let mut block = Block::new(1, genesis.hash.unwrap(), vec![], "v0.1", 2);
//! mine(&mut block).unwrap();
//!
//! assert!(block.hash.unwrap().to_hex().starts_with("00"));
//! assert!(BlockValidator::is_valid_chain(&[genesis, block]));
//! ```

pub mod pow;
pub mod validator;

// Re-export commonly used types
pub use pow::{mine, Candidate, MiningRace, PowError, RaceOutcome, RaceWinner};
pub use validator::{
    AccountRejection, BlockValidator, ChainValidationError, Rejected, TransactionValidator,
    UtxoRejection, ValidationError, ValidationOutcome,
};
