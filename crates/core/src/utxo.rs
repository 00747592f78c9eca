//! The set of unspent transaction outputs.
//!
//! A key present in the set means that output is still spendable. `spend` is
//! the only way to consume one. Cloning the set gives an independent copy for
//! speculative validation.

use crate::transaction::{OutPoint, TxOut, UtxoTransaction};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UtxoSet {
    outputs: HashMap<OutPoint, TxOut>,
}

impl UtxoSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether `outpoint` is unspent.
    pub fn has(&self, outpoint: &OutPoint) -> bool {
        self.outputs.contains_key(outpoint)
    }

    pub fn get(&self, outpoint: &OutPoint) -> Option<&TxOut> {
        self.outputs.get(outpoint)
    }

    pub fn get_amount(&self, outpoint: &OutPoint) -> Option<u64> {
        self.outputs.get(outpoint).map(|out| out.amount)
    }

    /// Consume an output, returning it if it was unspent.
    pub fn spend(&mut self, outpoint: &OutPoint) -> Option<TxOut> {
        self.outputs.remove(outpoint)
    }

    /// Insert an unspent output.
    ///
    /// Inserting over an unspent key overwrites it; that only happens when two
    /// transactions share an identifier, so it is logged.
    pub fn add_output(&mut self, outpoint: OutPoint, out: TxOut) {
        if let Some(previous) = self.outputs.insert(outpoint, out) {
            tracing::warn!(
                %outpoint,
                overwritten_amount = previous.amount,
                "unspent output inserted twice"
            );
        }
    }

    /// Insert every output of `tx` under its identifier.
    pub fn add_outputs_of(&mut self, tx: &UtxoTransaction) {
        for (index, out) in tx.outputs.iter().enumerate() {
            self.add_output(tx.outpoint(index as u32), out.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OutPoint, &TxOut)> {
        self.outputs.iter()
    }

    /// Unspent outputs paying `receiver`.
    pub fn outputs_of<'a>(&'a self, receiver: &'a str) -> impl Iterator<Item = (&'a OutPoint, &'a TxOut)> {
        self.outputs
            .iter()
            .filter(move |(_, out)| out.receiver == receiver)
    }

    /// Sum of unspent outputs paying `receiver`.
    pub fn balance_of(&self, receiver: &str) -> u64 {
        self.outputs_of(receiver)
            .fold(0u64, |acc, (_, out)| acc.saturating_add(out.amount))
    }

    /// Sum of all unspent outputs.
    pub fn total_value(&self) -> u64 {
        self.outputs
            .values()
            .fold(0u64, |acc, out| acc.saturating_add(out.amount))
    }
}
