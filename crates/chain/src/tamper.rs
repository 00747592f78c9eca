//! Deliberate corruption of stored blocks.
//!
//! Each [`Tamper`] edits one block of a copy of the chain the way an attacker
//! editing a stored file would, then runs full-chain validation on the copy.
//! The original blocks are never touched.

use powchain_consensus::{BlockValidator, ChainValidationError};
use powchain_core::{Block, Hash, Transaction};
use std::fmt;

/// A single kind of corruption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tamper {
    /// Change the first transaction's contents and re-derive its id, leaving
    /// the header's Merkle root stale.
    MerkleRoot,
    /// Flip a byte of the first transaction's stored id.
    TxId,
    /// Flip a byte of the header's parent link.
    PrevHash,
    /// Flip a byte of the stored block hash.
    ProofOfWork,
}

impl Tamper {
    pub const ALL: [Tamper; 4] = [
        Tamper::MerkleRoot,
        Tamper::TxId,
        Tamper::PrevHash,
        Tamper::ProofOfWork,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Tamper::MerkleRoot => "merkle_root",
            Tamper::TxId => "tx_id",
            Tamper::PrevHash => "prev_hash",
            Tamper::ProofOfWork => "proof_of_work",
        }
    }

    /// Corrupt `block` in place. Returns false if the block has nothing this
    /// kind of tamper can touch.
    pub fn apply(self, block: &mut Block) -> bool {
        match self {
            Tamper::MerkleRoot => match block.transactions.first_mut() {
                Some(tx) => {
                    alter_contents(tx);
                    true
                }
                None => false,
            },
            Tamper::TxId => match block.transactions.first_mut() {
                Some(tx) => {
                    let id = tx.tx_id_mut();
                    *id = flip_byte(*id);
                    true
                }
                None => false,
            },
            Tamper::PrevHash => {
                block.header.prev_hash = flip_byte(block.header.prev_hash);
                true
            }
            Tamper::ProofOfWork => match block.hash {
                Some(hash) => {
                    block.hash = Some(flip_byte(hash));
                    true
                }
                None => false,
            },
        }
    }
}

impl fmt::Display for Tamper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn flip_byte(hash: Hash) -> Hash {
    let mut bytes = hash.0;
    bytes[0] ^= 0x01;
    Hash(bytes)
}

fn alter_contents(tx: &mut Transaction) {
    match tx {
        Transaction::Account(transfer) => {
            transfer.amount = transfer.amount.wrapping_add(1);
            transfer.refresh_id();
        }
        Transaction::Utxo(utxo_tx) => {
            match utxo_tx.outputs.first_mut() {
                Some(output) => output.amount = output.amount.wrapping_add(1),
                None => utxo_tx.timestamp = utxo_tx.timestamp.wrapping_add(1),
            }
            utxo_tx.refresh_id();
        }
    }
}

/// Result of one tamper attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TamperCheck {
    pub tamper: Tamper,
    pub block_index: usize,
    /// The first validation failure on the tampered copy, if any.
    pub error: Option<ChainValidationError>,
}

impl TamperCheck {
    pub fn detected(&self) -> bool {
        self.error.is_some()
    }
}

/// Tamper with block `target` of a copy of `blocks` and validate the copy.
///
/// Genesis is trusted by construction and never a target; `None` is returned
/// for it, for an out-of-range target, or when the block has nothing to
/// corrupt.
pub fn check(blocks: &[Block], target: usize, tamper: Tamper) -> Option<TamperCheck> {
    if target == 0 || target >= blocks.len() {
        return None;
    }

    let mut copy = blocks.to_vec();
    if !tamper.apply(&mut copy[target]) {
        return None;
    }

    let error = BlockValidator::validate_chain(&copy).err();
    match &error {
        Some(err) => tracing::debug!(%tamper, target, error = %err, "tamper detected"),
        None => tracing::warn!(%tamper, target, "tamper went undetected"),
    }

    Some(TamperCheck {
        tamper,
        block_index: target,
        error,
    })
}

/// Run every kind of tamper against block `target`.
pub fn check_all(blocks: &[Block], target: usize) -> Vec<TamperCheck> {
    Tamper::ALL
        .iter()
        .filter_map(|&tamper| check(blocks, target, tamper))
        .collect()
}
