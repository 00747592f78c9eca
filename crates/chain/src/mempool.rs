//! Transaction pool for pending transactions.
//!
//! The pool is an explicit handle passed into each mining round. Rounds
//! sample from it and remove what they mine; rejected transactions stay.

use powchain_core::{Hash, Transaction};
use rand::Rng;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Errors that can occur during mempool operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MempoolError {
    #[error("transaction already in mempool")]
    DuplicateTransaction,

    #[error("mempool is full (capacity: {0})")]
    MempoolFull(usize),

    #[error("transaction not found in mempool")]
    TransactionNotFound,
}

pub type Result<T> = std::result::Result<T, MempoolError>;

/// Configuration for the mempool.
#[derive(Debug, Clone)]
pub struct MempoolConfig {
    /// Maximum number of transactions in the mempool.
    pub max_transactions: usize,
}

impl Default for MempoolConfig {
    fn default() -> Self {
        Self {
            max_transactions: 100_000,
        }
    }
}

/// Transaction mempool, keyed by transaction id, iterated in arrival order.
#[derive(Debug, Clone)]
pub struct Mempool {
    /// Configuration.
    config: MempoolConfig,
    /// Transactions indexed by id.
    transactions: HashMap<Hash, Transaction>,
    /// Ids in arrival order.
    order: Vec<Hash>,
}

impl Mempool {
    /// Create a new mempool with default configuration.
    pub fn new() -> Self {
        Self::with_config(MempoolConfig::default())
    }

    /// Create a new mempool with the given configuration.
    pub fn with_config(config: MempoolConfig) -> Self {
        Self {
            config,
            transactions: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Get the number of transactions in the mempool.
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// Check if the mempool is empty.
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Check if a transaction is in the mempool.
    pub fn contains(&self, tx_id: &Hash) -> bool {
        self.transactions.contains_key(tx_id)
    }

    /// Get a transaction from the mempool.
    pub fn get(&self, tx_id: &Hash) -> Option<&Transaction> {
        self.transactions.get(tx_id)
    }

    /// Add a transaction to the mempool.
    pub fn add(&mut self, tx: Transaction) -> Result<()> {
        let tx_id = tx.tx_id();

        if self.contains(&tx_id) {
            return Err(MempoolError::DuplicateTransaction);
        }

        if self.transactions.len() >= self.config.max_transactions {
            return Err(MempoolError::MempoolFull(self.config.max_transactions));
        }

        self.order.push(tx_id);
        self.transactions.insert(tx_id, tx);

        Ok(())
    }

    /// Add many transactions, skipping ones the pool refuses.
    ///
    /// Returns how many were added.
    pub fn extend(&mut self, txs: impl IntoIterator<Item = Transaction>) -> usize {
        txs.into_iter()
            .map(|tx| self.add(tx))
            .filter(|result| result.is_ok())
            .count()
    }

    /// Remove a transaction from the mempool.
    pub fn remove(&mut self, tx_id: &Hash) -> Result<Transaction> {
        let tx = self
            .transactions
            .remove(tx_id)
            .ok_or(MempoolError::TransactionNotFound)?;
        self.order.retain(|id| id != tx_id);
        Ok(tx)
    }

    /// Remove every listed transaction that is present.
    ///
    /// Returns how many were removed.
    pub fn remove_batch(&mut self, tx_ids: &[Hash]) -> usize {
        let targets: HashSet<&Hash> = tx_ids.iter().collect();
        let before = self.transactions.len();
        self.transactions.retain(|id, _| !targets.contains(id));
        self.order.retain(|id| !targets.contains(id));
        before - self.transactions.len()
    }

    /// Pick up to `limit` transactions uniformly at random, returned in
    /// arrival order.
    pub fn sample<R: Rng + ?Sized>(&self, limit: usize, rng: &mut R) -> Vec<Transaction> {
        if limit >= self.order.len() {
            return self.get_all();
        }

        let mut picked = rand::seq::index::sample(rng, self.order.len(), limit).into_vec();
        picked.sort_unstable();
        picked
            .into_iter()
            .filter_map(|i| self.transactions.get(&self.order[i]).cloned())
            .collect()
    }

    /// Clear all transactions from the mempool.
    pub fn clear(&mut self) {
        self.transactions.clear();
        self.order.clear();
    }

    /// Get all transactions in arrival order.
    pub fn get_all(&self) -> Vec<Transaction> {
        self.order
            .iter()
            .filter_map(|id| self.transactions.get(id).cloned())
            .collect()
    }

    /// Get mempool statistics.
    pub fn stats(&self) -> MempoolStats {
        MempoolStats {
            total_transactions: self.len(),
            capacity: self.config.max_transactions,
        }
    }
}

impl Default for Mempool {
    fn default() -> Self {
        Self::new()
    }
}

/// Mempool statistics.
#[derive(Debug, Clone)]
pub struct MempoolStats {
    /// Total number of transactions.
    pub total_transactions: usize,
    /// Mempool capacity.
    pub capacity: usize,
}
