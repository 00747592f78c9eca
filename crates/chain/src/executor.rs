//! Block execution engine.
//!
//! Applies an accepted block to the live ledger. The rules are the same ones
//! used for speculative validation, but here they mutate authoritative state.
//! A transaction that fails at this stage passed validation against a snapshot
//! yet fails against live state, so it is reported as an integrity warning.

use powchain_consensus::TransactionValidator;
use powchain_core::{Balances, Block, Hash, Transaction, UtxoSet};

/// Canonical ledger state, one per chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ledger {
    Account(Balances),
    Utxo(UtxoSet),
}

impl Ledger {
    pub fn model_name(&self) -> &'static str {
        match self {
            Ledger::Account(_) => "account",
            Ledger::Utxo(_) => "utxo",
        }
    }

    pub fn as_balances(&self) -> Option<&Balances> {
        match self {
            Ledger::Account(balances) => Some(balances),
            Ledger::Utxo(_) => None,
        }
    }

    pub fn as_utxos(&self) -> Option<&UtxoSet> {
        match self {
            Ledger::Utxo(utxos) => Some(utxos),
            Ledger::Account(_) => None,
        }
    }

    /// Number of accounts or unspent outputs.
    pub fn size(&self) -> usize {
        match self {
            Ledger::Account(balances) => balances.len(),
            Ledger::Utxo(utxos) => utxos.len(),
        }
    }

    /// Total value held in the ledger.
    pub fn total_value(&self) -> u64 {
        match self {
            Ledger::Account(balances) => balances.total(),
            Ledger::Utxo(utxos) => utxos.total_value(),
        }
    }
}

/// Result of applying a single transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
    /// Transaction id.
    pub tx_id: Hash,
    /// Whether the transaction changed the ledger.
    pub success: bool,
    /// Reason it was skipped.
    pub error: Option<String>,
}

/// Result of applying a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyReport {
    /// Block hash.
    pub block_hash: Option<Hash>,
    /// Per-transaction receipts in block order.
    pub receipts: Vec<TransactionReceipt>,
    pub applied: usize,
    pub skipped: usize,
}

impl ApplyReport {
    pub fn is_clean(&self) -> bool {
        self.skipped == 0
    }
}

/// Block executor over the live ledger.
pub struct Executor<'a> {
    ledger: &'a mut Ledger,
}

impl<'a> Executor<'a> {
    /// Create a new executor.
    pub fn new(ledger: &'a mut Ledger) -> Self {
        Self { ledger }
    }

    /// Apply every transaction of `block` in order.
    pub fn execute_block(&mut self, block: &Block) -> ApplyReport {
        let receipts: Vec<TransactionReceipt> = block
            .transactions
            .iter()
            .map(|tx| self.execute_transaction(tx))
            .collect();

        let applied = receipts.iter().filter(|r| r.success).count();
        let skipped = receipts.len() - applied;
        if skipped > 0 {
            tracing::warn!(
                index = block.index,
                applied,
                skipped,
                "accepted block did not apply cleanly to live state"
            );
        }

        ApplyReport {
            block_hash: block.hash,
            receipts,
            applied,
            skipped,
        }
    }

    /// Apply a single transaction.
    pub fn execute_transaction(&mut self, tx: &Transaction) -> TransactionReceipt {
        let tx_id = tx.tx_id();
        let outcome = match &mut *self.ledger {
            Ledger::Account(balances) => Self::execute_transfer(balances, tx),
            Ledger::Utxo(utxos) => Self::execute_utxo(utxos, tx),
        };

        match outcome {
            Ok(()) => TransactionReceipt {
                tx_id,
                success: true,
                error: None,
            },
            Err(error) => {
                tracing::warn!(%tx_id, %error, "transaction skipped on live ledger");
                TransactionReceipt {
                    tx_id,
                    success: false,
                    error: Some(error),
                }
            }
        }
    }

    fn execute_transfer(balances: &mut Balances, tx: &Transaction) -> Result<(), String> {
        let transfer =
            TransactionValidator::check_account(tx, balances).map_err(|e| e.to_string())?;
        balances
            .debit(&transfer.sender, transfer.amount)
            .map_err(|e| e.to_string())?;
        balances.credit(&transfer.receiver, transfer.amount);
        Ok(())
    }

    fn execute_utxo(utxos: &mut UtxoSet, tx: &Transaction) -> Result<(), String> {
        // Coinbase outputs are minted unconditionally.
        if let Transaction::Utxo(utxo_tx) = tx {
            if utxo_tx.is_coinbase() {
                utxos.add_outputs_of(utxo_tx);
                return Ok(());
            }
        }

        TransactionValidator::check_utxo(tx, utxos).map_err(|e| e.to_string())?;
        if let Transaction::Utxo(utxo_tx) = tx {
            for input in &utxo_tx.inputs {
                utxos.spend(input);
            }
            utxos.add_outputs_of(utxo_tx);
        }
        Ok(())
    }

    /// Credit a mining reward. Only meaningful for the account model; UTXO
    /// rewards travel in the coinbase.
    pub fn credit_reward(&mut self, address: &str, amount: u64) -> bool {
        match &mut *self.ledger {
            Ledger::Account(balances) => {
                balances.credit(address, amount);
                true
            }
            Ledger::Utxo(_) => false,
        }
    }
}
