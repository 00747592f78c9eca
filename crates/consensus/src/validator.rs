//! Transaction and block validation rules.
//!
//! Transaction batches are validated speculatively: each model works on a
//! private copy of the ledger so that later transactions in a batch see the
//! effect of earlier ones, while the live ledger is never touched. Rejections
//! are returned as data alongside acceptances.
//!
//! Block validation is all-or-nothing and reported as [`ValidationError`].

use powchain_core::{
    AccountTransaction, BalanceError, Balances, Block, Hash, OutPoint, Transaction, UtxoSet,
};
use std::collections::HashSet;
use thiserror::Error;

/// Why an account-model transaction was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountRejection {
    #[error("bad_tx_id")]
    BadTxId,

    #[error("wrong_type")]
    WrongType,

    #[error("unknown_party")]
    UnknownParty,

    #[error("non_positive")]
    NonPositive,

    #[error("insufficient (required {required}, available {available})")]
    Insufficient { required: u64, available: u64 },
}

impl From<BalanceError> for AccountRejection {
    fn from(err: BalanceError) -> Self {
        match err {
            BalanceError::UnknownAccount(_) => AccountRejection::UnknownParty,
            BalanceError::Insufficient {
                required,
                available,
            } => AccountRejection::Insufficient {
                required,
                available,
            },
        }
    }
}

/// Why a UTXO-model transaction was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UtxoRejection {
    #[error("bad_tx_id")]
    BadTxId,

    #[error("wrong_type")]
    WrongType,

    #[error("missing_input {0}")]
    MissingInput(OutPoint),

    #[error("overspend (inputs {inputs}, outputs {outputs})")]
    Overspend { inputs: u64, outputs: u64 },
}

/// A rejected transaction, by position in the submitted batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejected<R> {
    pub index: usize,
    pub tx_id: Hash,
    pub reason: R,
}

/// Accepted transactions in batch order, plus rejections with reasons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome<R> {
    pub accepted: Vec<Transaction>,
    pub rejected: Vec<Rejected<R>>,
}

impl<R> ValidationOutcome<R> {
    fn new() -> Self {
        Self {
            accepted: Vec::new(),
            rejected: Vec::new(),
        }
    }

    fn reject(&mut self, index: usize, tx: &Transaction, reason: R) {
        self.rejected.push(Rejected {
            index,
            tx_id: tx.tx_id(),
            reason,
        });
    }

    pub fn accepted_ids(&self) -> Vec<Hash> {
        self.accepted.iter().map(|tx| tx.tx_id()).collect()
    }

    /// Accepted transactions that are not coinbases.
    pub fn transfer_count(&self) -> usize {
        self.accepted.iter().filter(|tx| !tx.is_coinbase()).count()
    }
}

/// Transaction validator for both ledger models.
pub struct TransactionValidator;

impl TransactionValidator {
    /// Validate an account-model batch in order against a copy of `balances`.
    pub fn validate_account_batch(
        batch: &[Transaction],
        balances: &Balances,
    ) -> ValidationOutcome<AccountRejection> {
        let mut snapshot = balances.clone();
        let mut outcome = ValidationOutcome::new();

        for (index, tx) in batch.iter().enumerate() {
            let settled = Self::check_account(tx, &snapshot).and_then(|transfer| {
                snapshot
                    .debit(&transfer.sender, transfer.amount)
                    .map_err(AccountRejection::from)?;
                snapshot.credit(&transfer.receiver, transfer.amount);
                Ok(())
            });
            match settled {
                Ok(()) => outcome.accepted.push(tx.clone()),
                Err(reason) => outcome.reject(index, tx, reason),
            }
        }

        outcome
    }

    /// Check a single account-model transaction against the running snapshot,
    /// returning the transfer it carries.
    pub fn check_account<'a>(
        tx: &'a Transaction,
        balances: &Balances,
    ) -> std::result::Result<&'a AccountTransaction, AccountRejection> {
        if !tx.verify_id() {
            return Err(AccountRejection::BadTxId);
        }
        let Transaction::Account(transfer) = tx else {
            return Err(AccountRejection::WrongType);
        };
        if !balances.contains(&transfer.sender) || !balances.contains(&transfer.receiver) {
            return Err(AccountRejection::UnknownParty);
        }
        if transfer.amount == 0 {
            return Err(AccountRejection::NonPositive);
        }
        let available = balances.balance(&transfer.sender).unwrap_or(0);
        if available < transfer.amount {
            return Err(AccountRejection::Insufficient {
                required: transfer.amount,
                available,
            });
        }
        Ok(transfer)
    }

    /// Validate a UTXO-model batch in order against a copy of `utxos`.
    ///
    /// Accepted transactions spend their inputs and add their outputs to the
    /// copy, so later transactions may chain off them.
    pub fn validate_utxo_batch(
        batch: &[Transaction],
        utxos: &UtxoSet,
    ) -> ValidationOutcome<UtxoRejection> {
        let mut snapshot = utxos.clone();
        let mut outcome = ValidationOutcome::new();

        for (index, tx) in batch.iter().enumerate() {
            match Self::check_utxo(tx, &snapshot) {
                Ok(()) => {
                    if let Transaction::Utxo(utxo_tx) = tx {
                        for input in &utxo_tx.inputs {
                            snapshot.spend(input);
                        }
                        snapshot.add_outputs_of(utxo_tx);
                    }
                    outcome.accepted.push(tx.clone());
                }
                Err(reason) => outcome.reject(index, tx, reason),
            }
        }

        outcome
    }

    /// Check a single UTXO-model transaction against the running snapshot.
    pub fn check_utxo(
        tx: &Transaction,
        utxos: &UtxoSet,
    ) -> std::result::Result<(), UtxoRejection> {
        if !tx.verify_id() {
            return Err(UtxoRejection::BadTxId);
        }
        let Transaction::Utxo(utxo_tx) = tx else {
            return Err(UtxoRejection::WrongType);
        };
        if utxo_tx.is_coinbase() {
            return Ok(());
        }

        // The same outpoint listed twice is only spendable once.
        let mut seen = HashSet::new();
        let mut inputs: u64 = 0;
        for input in &utxo_tx.inputs {
            let amount = match utxos.get_amount(input) {
                Some(amount) if seen.insert(*input) => amount,
                _ => return Err(UtxoRejection::MissingInput(*input)),
            };
            inputs = inputs.saturating_add(amount);
        }

        let outputs = utxo_tx.output_total();
        if inputs < outputs {
            return Err(UtxoRejection::Overspend { inputs, outputs });
        }
        Ok(())
    }
}

/// Errors that can occur during block validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("block index mismatch (expected {expected}, got {got})")]
    InvalidIndex { expected: u64, got: u64 },

    #[error("block prev_hash mismatch (expected {expected}, got {got})")]
    InvalidPrevHash { expected: Hash, got: Hash },

    #[error("invalid proof of work")]
    InvalidProofOfWork,

    #[error("block merkle root verification failed")]
    InvalidMerkleRoot,

    #[error("transaction {index} has a bad identifier")]
    TransactionIdMismatch { index: usize },

    #[error("duplicate transaction in block")]
    DuplicateTransaction,
}

pub type Result<T> = std::result::Result<T, ValidationError>;

/// A full-chain check failure, located by block position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("block {index}: {source}")]
pub struct ChainValidationError {
    pub index: usize,
    #[source]
    pub source: ValidationError,
}

/// Block validator.
pub struct BlockValidator;

impl BlockValidator {
    /// Validate block contents against its header.
    pub fn validate_block_structure(block: &Block) -> Result<()> {
        if let Some(index) = block.first_bad_transaction() {
            return Err(ValidationError::TransactionIdMismatch { index });
        }

        if !block.verify_merkle_root() {
            return Err(ValidationError::InvalidMerkleRoot);
        }

        let mut seen = HashSet::new();
        for tx in &block.transactions {
            if !seen.insert(tx.tx_id()) {
                return Err(ValidationError::DuplicateTransaction);
            }
        }

        Ok(())
    }

    /// Validate block extends the parent correctly.
    pub fn validate_block_extends_parent(block: &Block, parent: &Block) -> Result<()> {
        let expected_index = parent.index.saturating_add(1);
        if block.index != expected_index {
            return Err(ValidationError::InvalidIndex {
                expected: expected_index,
                got: block.index,
            });
        }

        let expected = parent.hash.unwrap_or(Hash::ZERO);
        if parent.hash.is_none() || block.header.prev_hash != expected {
            return Err(ValidationError::InvalidPrevHash {
                expected,
                got: block.header.prev_hash,
            });
        }

        Ok(())
    }

    pub fn validate_proof_of_work(block: &Block) -> Result<()> {
        if !block.is_valid_proof_of_work() {
            return Err(ValidationError::InvalidProofOfWork);
        }
        Ok(())
    }

    /// Full acceptance check: link (skipped without a parent), PoW (waived
    /// for genesis), merkle root and every transaction id.
    pub fn validate_full(block: &Block, parent: Option<&Block>) -> Result<()> {
        if let Some(parent) = parent {
            Self::validate_block_extends_parent(block, parent)?;
        }
        if block.index != 0 {
            Self::validate_proof_of_work(block)?;
        }
        Self::validate_block_structure(block)?;
        Ok(())
    }

    /// Validate a whole chain. Genesis must sit at index 0 and is trusted;
    /// every later block must link to its predecessor and pass
    /// [`Self::validate_full`].
    ///
    /// Pure: calling it any number of times gives the same answer.
    pub fn validate_chain(blocks: &[Block]) -> std::result::Result<(), ChainValidationError> {
        let Some(genesis) = blocks.first() else {
            return Ok(());
        };
        if genesis.index != 0 {
            return Err(ChainValidationError {
                index: 0,
                source: ValidationError::InvalidIndex {
                    expected: 0,
                    got: genesis.index,
                },
            });
        }

        for (index, pair) in blocks.windows(2).enumerate() {
            Self::validate_full(&pair[1], Some(&pair[0])).map_err(|source| {
                ChainValidationError {
                    index: index + 1,
                    source,
                }
            })?;
        }

        Ok(())
    }

    pub fn is_valid_chain(blocks: &[Block]) -> bool {
        Self::validate_chain(blocks).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pow::mine;
    use powchain_core::{hash, AccountTransaction, TxOut, UtxoTransaction};

    fn transfer(sender: &str, receiver: &str, amount: u64) -> Transaction {
        AccountTransaction::with_timestamp(sender, receiver, amount, 1_700_000_000).into()
    }

    fn balances(entries: &[(&str, u64)]) -> Balances {
        entries.iter().map(|(k, v)| (*k, *v)).collect()
    }

    #[test]
    fn test_account_batch_settles_in_order() {
        let live = balances(&[("A", 100), ("B", 0)]);
        let batch = vec![transfer("A", "B", 60), transfer("A", "B", 50)];

        let outcome = TransactionValidator::validate_account_batch(&batch, &live);

        assert_eq!(outcome.accepted, vec![batch[0].clone()]);
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(outcome.rejected[0].index, 1);
        assert_eq!(outcome.rejected[0].tx_id, batch[1].tx_id());
        assert_eq!(
            outcome.rejected[0].reason,
            AccountRejection::Insufficient {
                required: 50,
                available: 40
            }
        );
        // The live ledger is untouched.
        assert_eq!(live.balance("A"), Some(100));
    }

    #[test]
    fn test_account_batch_later_tx_sees_credit() {
        let live = balances(&[("A", 10), ("B", 0), ("C", 0)]);
        let batch = vec![transfer("A", "B", 10), transfer("B", "C", 10)];

        let outcome = TransactionValidator::validate_account_batch(&batch, &live);
        assert_eq!(outcome.accepted.len(), 2);
        assert!(outcome.rejected.is_empty());
    }

    #[test]
    fn test_check_account_returns_transfer() {
        let live = balances(&[("A", 100), ("B", 0)]);
        let tx = transfer("A", "B", 30);

        let checked = TransactionValidator::check_account(&tx, &live).unwrap();
        assert_eq!(checked.sender, "A");
        assert_eq!(checked.amount, 30);

        assert_eq!(
            TransactionValidator::check_account(&transfer("A", "B", 101), &live),
            Err(AccountRejection::Insufficient {
                required: 101,
                available: 100
            })
        );
    }

    #[test]
    fn test_balance_errors_map_to_rejections() {
        assert_eq!(
            AccountRejection::from(BalanceError::UnknownAccount("Z".into())),
            AccountRejection::UnknownParty
        );
        assert_eq!(
            AccountRejection::from(BalanceError::Insufficient {
                required: 5,
                available: 1
            }),
            AccountRejection::Insufficient {
                required: 5,
                available: 1
            }
        );
    }

    #[test]
    fn test_account_rejection_reasons() {
        let live = balances(&[("A", 100), ("B", 0)]);

        let mut forged = transfer("A", "B", 5);
        *forged.tx_id_mut() = hash(b"forged");

        let batch = vec![
            forged,
            transfer("A", "stranger", 5),
            transfer("A", "B", 0),
            UtxoTransaction::coinbase("A", 50, 1).into(),
        ];

        let reasons: Vec<_> = TransactionValidator::validate_account_batch(&batch, &live)
            .rejected
            .into_iter()
            .map(|r| r.reason)
            .collect();

        assert_eq!(
            reasons,
            vec![
                AccountRejection::BadTxId,
                AccountRejection::UnknownParty,
                AccountRejection::NonPositive,
                AccountRejection::WrongType,
            ]
        );
    }

    #[test]
    fn test_coinbase_always_accepted() {
        let empty = UtxoSet::new();
        let cb: Transaction = UtxoTransaction::coinbase("M", 50, 1).into();

        let outcome = TransactionValidator::validate_utxo_batch(&[cb.clone()], &empty);
        assert_eq!(outcome.accepted, vec![cb]);
        assert!(empty.is_empty());
    }

    #[test]
    fn test_double_spend_in_batch() {
        let cb = UtxoTransaction::coinbase("M", 50, 1);
        let first = UtxoTransaction::with_timestamp(
            vec![cb.outpoint(0)],
            vec![TxOut::new("A", 50)],
            2,
        );
        let second = UtxoTransaction::with_timestamp(
            vec![cb.outpoint(0)],
            vec![TxOut::new("B", 50)],
            2,
        );
        let batch: Vec<Transaction> = vec![cb.clone().into(), first.into(), second.into()];

        let outcome = TransactionValidator::validate_utxo_batch(&batch, &UtxoSet::new());

        assert_eq!(outcome.accepted.len(), 2);
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(outcome.rejected[0].index, 2);
        assert_eq!(
            outcome.rejected[0].reason,
            UtxoRejection::MissingInput(cb.outpoint(0))
        );
    }

    #[test]
    fn test_same_input_twice_in_one_tx() {
        let cb = UtxoTransaction::coinbase("M", 50, 1);
        let mut live = UtxoSet::new();
        live.add_outputs_of(&cb);

        let tx: Transaction = UtxoTransaction::with_timestamp(
            vec![cb.outpoint(0), cb.outpoint(0)],
            vec![TxOut::new("A", 100)],
            2,
        )
        .into();

        assert_eq!(
            TransactionValidator::check_utxo(&tx, &live),
            Err(UtxoRejection::MissingInput(cb.outpoint(0)))
        );
    }

    #[test]
    fn test_utxo_chaining_within_batch() {
        let cb = UtxoTransaction::coinbase("M", 50, 1);
        let mut live = UtxoSet::new();
        live.add_outputs_of(&cb);

        let pay = UtxoTransaction::with_timestamp(
            vec![cb.outpoint(0)],
            vec![TxOut::new("A", 30), TxOut::new("M", 20)],
            2,
        );
        let onward = UtxoTransaction::with_timestamp(
            vec![pay.outpoint(0)],
            vec![TxOut::new("B", 30)],
            3,
        );
        let batch: Vec<Transaction> = vec![pay.into(), onward.into()];

        let outcome = TransactionValidator::validate_utxo_batch(&batch, &live);
        assert_eq!(outcome.accepted.len(), 2);
        assert_eq!(outcome.transfer_count(), 2);
        assert_eq!(live.len(), 1);
    }

    #[test]
    fn test_utxo_rejection_reasons() {
        let cb = UtxoTransaction::coinbase("M", 50, 1);
        let mut live = UtxoSet::new();
        live.add_outputs_of(&cb);

        let overspend: Transaction = UtxoTransaction::with_timestamp(
            vec![cb.outpoint(0)],
            vec![TxOut::new("A", 51)],
            2,
        )
        .into();
        let missing: Transaction = UtxoTransaction::with_timestamp(
            vec![OutPoint::new(hash(b"nowhere"), 0)],
            vec![TxOut::new("A", 1)],
            2,
        )
        .into();
        let mut forged: Transaction = UtxoTransaction::coinbase("X", 1, 1).into();
        *forged.tx_id_mut() = hash(b"forged");

        let batch = vec![overspend, missing, forged, transfer("A", "B", 1)];
        let reasons: Vec<_> = TransactionValidator::validate_utxo_batch(&batch, &live)
            .rejected
            .into_iter()
            .map(|r| r.reason)
            .collect();

        assert_eq!(
            reasons,
            vec![
                UtxoRejection::Overspend {
                    inputs: 50,
                    outputs: 51
                },
                UtxoRejection::MissingInput(OutPoint::new(hash(b"nowhere"), 0)),
                UtxoRejection::BadTxId,
                UtxoRejection::WrongType,
            ]
        );
    }

    fn mined_chain(len: usize) -> Vec<Block> {
        let mut chain = vec![Block::genesis("v0.1", 2)];
        for i in 1..len {
            let prev = chain[i - 1].hash.unwrap();
            let txs = vec![transfer("A", "B", i as u64)];
            let mut block = Block::new(i as u64, prev, txs, "v0.1", 2);
            mine(&mut block).unwrap();
            chain.push(block);
        }
        chain
    }

    #[test]
    fn test_valid_chain() {
        let chain = mined_chain(4);
        assert!(BlockValidator::is_valid_chain(&chain));
        // Idempotent.
        assert!(BlockValidator::is_valid_chain(&chain));
        assert!(BlockValidator::is_valid_chain(&[]));
    }

    #[test]
    fn test_prev_hash_tamper_detected() {
        let mut chain = mined_chain(3);
        chain[2].header.prev_hash = Hash::from_hex(&"1".repeat(64)).unwrap();

        let err = BlockValidator::validate_chain(&chain).unwrap_err();
        assert_eq!(err.index, 2);
        assert!(matches!(err.source, ValidationError::InvalidPrevHash { .. }));
    }

    #[test]
    fn test_hash_tamper_detected() {
        let mut chain = mined_chain(3);
        let mut bytes = chain[1].hash.unwrap().0;
        bytes[31] ^= 0x01;
        chain[1].hash = Some(Hash(bytes));

        assert!(!BlockValidator::is_valid_chain(&chain));
        assert_eq!(
            BlockValidator::validate_proof_of_work(&chain[1]),
            Err(ValidationError::InvalidProofOfWork)
        );
    }

    #[test]
    fn test_tx_id_tamper_detected() {
        let mut chain = mined_chain(3);
        *chain[1].transactions[0].tx_id_mut() = Hash::from_hex(&"deadbeef".repeat(8)).unwrap();

        let err = BlockValidator::validate_chain(&chain).unwrap_err();
        assert_eq!(err.index, 1);
        assert_eq!(
            err.source,
            ValidationError::TransactionIdMismatch { index: 0 }
        );
    }

    #[test]
    fn test_content_tamper_detected_by_merkle_root() {
        let mut chain = mined_chain(2);
        if let Transaction::Account(tx) = &mut chain[1].transactions[0] {
            tx.amount += 1;
            tx.refresh_id();
        }
        // Header untouched, so PoW still holds.
        assert!(chain[1].is_valid_proof_of_work());
        assert_eq!(
            BlockValidator::validate_full(&chain[1], Some(&chain[0])),
            Err(ValidationError::InvalidMerkleRoot)
        );
    }

    #[test]
    fn test_genesis_must_be_index_zero() {
        let mut chain = mined_chain(2);
        chain[0].index = 5;
        assert_eq!(BlockValidator::validate_chain(&chain).unwrap_err().index, 0);
    }

    #[test]
    fn test_block_extends_parent() {
        let chain = mined_chain(2);
        assert!(BlockValidator::validate_block_extends_parent(&chain[1], &chain[0]).is_ok());

        let mut skipped = chain[1].clone();
        skipped.index = 3;
        assert!(matches!(
            BlockValidator::validate_block_extends_parent(&skipped, &chain[0]),
            Err(ValidationError::InvalidIndex { expected: 1, got: 3 })
        ));
    }

    #[test]
    fn test_duplicate_transaction_rejected() {
        let tx = transfer("A", "B", 1);
        let block = Block::new(1, Hash::ZERO, vec![tx.clone(), tx], "v0.1", 0);
        assert_eq!(
            BlockValidator::validate_block_structure(&block),
            Err(ValidationError::DuplicateTransaction)
        );
    }
}
