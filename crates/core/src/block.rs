//! Block and block header structures.

use crate::current_timestamp;
use crate::hash::{hash, Hash};
use crate::merkle::{empty_root, merkle_root};
use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};

/// Version string stamped on blocks by default.
pub const DEFAULT_VERSION: &str = "v0.1";

/// The header of a block. Its serialization is the proof-of-work target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Hash of the previous block.
    pub prev_hash: Hash,
    /// Unix timestamp in seconds.
    pub timestamp: u64,
    /// Protocol version, e.g. "v0.1".
    pub version: String,
    /// Merkle root of transaction ids.
    pub tx_root: Hash,
    /// Proof-of-work counter.
    pub nonce: u64,
    /// Required number of leading zero hex characters.
    pub difficulty: u32,
}

impl BlockHeader {
    /// Deterministic serialization: `prev_hash|timestamp|version|tx_root|nonce|difficulty`.
    ///
    /// Field order and separator must not change, previously mined hashes depend on them.
    pub fn serialize(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}",
            self.prev_hash.to_hex(),
            self.timestamp,
            self.version,
            self.tx_root.to_hex(),
            self.nonce,
            self.difficulty
        )
    }

    /// Calculate the hash of this block header.
    pub fn hash(&self) -> Hash {
        hash(self.serialize().as_bytes())
    }
}

/// A block: position in the chain, header, ordered transactions and the
/// mined hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Position in the chain (0 for genesis).
    pub index: u64,
    /// Header digest once mined or loaded. Never recomputed implicitly.
    pub hash: Option<Hash>,
    /// Block header.
    pub header: BlockHeader,
    /// Transactions in this block.
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Create an unmined block stamped with the current time.
    pub fn new(
        index: u64,
        prev_hash: Hash,
        transactions: Vec<Transaction>,
        version: impl Into<String>,
        difficulty: u32,
    ) -> Self {
        let tx_root = Self::tx_root_of(&transactions);

        Self {
            index,
            hash: None,
            header: BlockHeader {
                prev_hash,
                timestamp: current_timestamp(),
                version: version.into(),
                tx_root,
                nonce: 0,
                difficulty,
            },
            transactions,
        }
    }

    /// Create the genesis block.
    ///
    /// Genesis is trusted by construction: its hash is computed directly and
    /// never has to satisfy the difficulty.
    pub fn genesis(version: impl Into<String>, difficulty: u32) -> Self {
        let mut block = Self::new(0, Hash::ZERO, Vec::new(), version, difficulty);
        block.header.tx_root = empty_root();
        block.hash = Some(block.compute_hash());
        block
    }

    fn tx_root_of(transactions: &[Transaction]) -> Hash {
        let ids: Vec<Hash> = transactions.iter().map(|tx| tx.tx_id()).collect();
        merkle_root(&ids)
    }

    /// Hash of the header under its current field values.
    pub fn compute_hash(&self) -> Hash {
        self.header.hash()
    }

    pub fn prev_hash(&self) -> Hash {
        self.header.prev_hash
    }

    pub fn difficulty(&self) -> u32 {
        self.header.difficulty
    }

    /// Check if this is the genesis block.
    pub fn is_genesis(&self) -> bool {
        self.index == 0 && self.header.prev_hash == Hash::ZERO
    }

    /// Get the number of transactions in this block.
    pub fn tx_count(&self) -> usize {
        self.transactions.len()
    }

    /// Identifiers of the contained transactions, in block order.
    pub fn tx_ids(&self) -> Vec<Hash> {
        self.transactions.iter().map(|tx| tx.tx_id()).collect()
    }

    /// Recompute `tx_root` after changing the transaction list.
    pub fn recompute_tx_root(&mut self) {
        self.header.tx_root = Self::tx_root_of(&self.transactions);
    }

    /// True iff the stored hash is set, meets the difficulty and matches the
    /// current header.
    pub fn is_valid_proof_of_work(&self) -> bool {
        match self.hash {
            Some(stored) => {
                stored.meets_difficulty(self.header.difficulty) && stored == self.compute_hash()
            }
            None => false,
        }
    }

    /// Verify the merkle root matches the transactions.
    pub fn verify_merkle_root(&self) -> bool {
        Self::tx_root_of(&self.transactions) == self.header.tx_root
    }

    /// Index of the first transaction whose identifier does not recompute.
    pub fn first_bad_transaction(&self) -> Option<usize> {
        self.transactions.iter().position(|tx| !tx.verify_id())
    }

    /// Verify every contained transaction's identifier.
    pub fn verify_transactions(&self) -> bool {
        self.first_bad_transaction().is_none()
    }
}
