//! Transaction types for both ledger models.
//!
//! Every transaction carries its own identifier, a digest over its content.
//! Mutating any field without calling `refresh_id` leaves the transaction
//! self-inconsistent, which `verify_id` detects.

use crate::current_timestamp;
use crate::hash::{hash, Hash};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Account-model transfer of `amount` from `sender` to `receiver`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountTransaction {
    /// Sender's public key.
    pub sender: String,
    /// Receiver's public key.
    pub receiver: String,
    /// Value to transfer.
    pub amount: u64,
    /// Unix timestamp in seconds.
    pub timestamp: u64,
    /// Identifier over the fields above.
    pub tx_id: Hash,
}

impl AccountTransaction {
    /// Create a transfer stamped with the current time.
    pub fn new(sender: impl Into<String>, receiver: impl Into<String>, amount: u64) -> Self {
        Self::with_timestamp(sender, receiver, amount, current_timestamp())
    }

    /// Create a transfer with an explicit timestamp.
    pub fn with_timestamp(
        sender: impl Into<String>,
        receiver: impl Into<String>,
        amount: u64,
        timestamp: u64,
    ) -> Self {
        let mut tx = Self {
            sender: sender.into(),
            receiver: receiver.into(),
            amount,
            timestamp,
            tx_id: Hash::ZERO,
        };
        tx.refresh_id();
        tx
    }

    /// The string the identifier is computed over.
    pub fn preimage(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.sender, self.receiver, self.amount, self.timestamp
        )
    }

    /// Recompute the identifier from the current fields.
    pub fn compute_id(&self) -> Hash {
        hash(self.preimage().as_bytes())
    }

    /// Check the stored identifier against the current fields.
    pub fn verify_id(&self) -> bool {
        self.tx_id == self.compute_id()
    }

    /// Store a freshly computed identifier.
    pub fn refresh_id(&mut self) {
        self.tx_id = self.compute_id();
    }
}

/// Reference to an output of an earlier UTXO transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    /// Identifier of the transaction that created the output.
    pub prev_tx_id: Hash,
    /// Position of the output in that transaction.
    pub prev_index: u32,
}

impl OutPoint {
    pub fn new(prev_tx_id: Hash, prev_index: u32) -> Self {
        Self {
            prev_tx_id,
            prev_index,
        }
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.prev_tx_id, self.prev_index)
    }
}

/// An output paying `amount` to `receiver`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOut {
    pub receiver: String,
    pub amount: u64,
}

impl TxOut {
    pub fn new(receiver: impl Into<String>, amount: u64) -> Self {
        Self {
            receiver: receiver.into(),
            amount,
        }
    }
}

/// UTXO-model transaction. No inputs means coinbase.
///
/// Inputs are not signed; whoever references an unspent output may spend it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoTransaction {
    pub inputs: Vec<OutPoint>,
    pub outputs: Vec<TxOut>,
    /// Unix timestamp in seconds.
    pub timestamp: u64,
    /// Identifier over inputs, outputs and timestamp.
    pub tx_id: Hash,
}

impl UtxoTransaction {
    /// Create a transaction stamped with the current time.
    pub fn new(inputs: Vec<OutPoint>, outputs: Vec<TxOut>) -> Self {
        Self::with_timestamp(inputs, outputs, current_timestamp())
    }

    /// Create a transaction with an explicit timestamp.
    pub fn with_timestamp(inputs: Vec<OutPoint>, outputs: Vec<TxOut>, timestamp: u64) -> Self {
        let mut tx = Self {
            inputs,
            outputs,
            timestamp,
            tx_id: Hash::ZERO,
        };
        tx.refresh_id();
        tx
    }

    /// Create a coinbase minting `amount` to `receiver`.
    pub fn coinbase(receiver: impl Into<String>, amount: u64, timestamp: u64) -> Self {
        Self::with_timestamp(Vec::new(), vec![TxOut::new(receiver, amount)], timestamp)
    }

    /// Check if this transaction mints without spending.
    pub fn is_coinbase(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Sum of all output amounts.
    pub fn output_total(&self) -> u64 {
        self.outputs
            .iter()
            .fold(0u64, |acc, out| acc.saturating_add(out.amount))
    }

    /// Outpoint referring to this transaction's output at `index`.
    pub fn outpoint(&self, index: u32) -> OutPoint {
        OutPoint::new(self.tx_id, index)
    }

    /// The string the identifier is computed over.
    pub fn preimage(&self) -> String {
        let inputs = self
            .inputs
            .iter()
            .map(|input| input.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let outputs = self
            .outputs
            .iter()
            .map(|out| format!("{}:{}", out.receiver, out.amount))
            .collect::<Vec<_>>()
            .join(",");
        format!("{}|{}|{}", inputs, outputs, self.timestamp)
    }

    /// Recompute the identifier from the current fields.
    pub fn compute_id(&self) -> Hash {
        hash(self.preimage().as_bytes())
    }

    /// Check the stored identifier against the current fields.
    pub fn verify_id(&self) -> bool {
        self.tx_id == self.compute_id()
    }

    /// Store a freshly computed identifier.
    pub fn refresh_id(&mut self) {
        self.tx_id = self.compute_id();
    }
}

/// A transaction of either ledger model.
///
/// Serialized untagged: the two payload shapes never share field names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Transaction {
    Account(AccountTransaction),
    Utxo(UtxoTransaction),
}

impl Transaction {
    /// The stored identifier.
    pub fn tx_id(&self) -> Hash {
        match self {
            Transaction::Account(tx) => tx.tx_id,
            Transaction::Utxo(tx) => tx.tx_id,
        }
    }

    /// Mutable access to the stored identifier.
    pub fn tx_id_mut(&mut self) -> &mut Hash {
        match self {
            Transaction::Account(tx) => &mut tx.tx_id,
            Transaction::Utxo(tx) => &mut tx.tx_id,
        }
    }

    pub fn compute_id(&self) -> Hash {
        match self {
            Transaction::Account(tx) => tx.compute_id(),
            Transaction::Utxo(tx) => tx.compute_id(),
        }
    }

    pub fn verify_id(&self) -> bool {
        match self {
            Transaction::Account(tx) => tx.verify_id(),
            Transaction::Utxo(tx) => tx.verify_id(),
        }
    }

    pub fn timestamp(&self) -> u64 {
        match self {
            Transaction::Account(tx) => tx.timestamp,
            Transaction::Utxo(tx) => tx.timestamp,
        }
    }

    /// Check if this is a UTXO coinbase. Account transfers never are.
    pub fn is_coinbase(&self) -> bool {
        matches!(self, Transaction::Utxo(tx) if tx.is_coinbase())
    }

    pub fn as_account(&self) -> Option<&AccountTransaction> {
        match self {
            Transaction::Account(tx) => Some(tx),
            Transaction::Utxo(_) => None,
        }
    }

    pub fn as_utxo(&self) -> Option<&UtxoTransaction> {
        match self {
            Transaction::Utxo(tx) => Some(tx),
            Transaction::Account(_) => None,
        }
    }
}

impl From<AccountTransaction> for Transaction {
    fn from(tx: AccountTransaction) -> Self {
        Transaction::Account(tx)
    }
}

impl From<UtxoTransaction> for Transaction {
    fn from(tx: UtxoTransaction) -> Self {
        Transaction::Utxo(tx)
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transaction::Account(tx) => write!(
                f,
                "{} -> {} : {}",
                short(&tx.sender),
                short(&tx.receiver),
                tx.amount
            ),
            Transaction::Utxo(tx) if tx.is_coinbase() => {
                write!(f, "coinbase {} outputs, {} minted", tx.outputs.len(), tx.output_total())
            }
            Transaction::Utxo(tx) => write!(
                f,
                "{} inputs -> {} outputs, {} moved",
                tx.inputs.len(),
                tx.outputs.len(),
                tx.output_total()
            ),
        }
    }
}

fn short(key: &str) -> &str {
    key.get(..6).unwrap_or(key)
}
