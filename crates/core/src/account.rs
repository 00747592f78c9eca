//! Account-model ledger state.

use std::collections::HashMap;
use thiserror::Error;

/// Errors from direct balance mutation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BalanceError {
    #[error("unknown account: {0}")]
    UnknownAccount(String),

    #[error("insufficient balance (required {required}, available {available})")]
    Insufficient { required: u64, available: u64 },
}

/// Balances keyed by account public key.
///
/// Cloning yields an independent snapshot for speculative validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Balances {
    accounts: HashMap<String, u64>,
}

impl Balances {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account with an opening balance, replacing any existing one.
    pub fn open(&mut self, key: impl Into<String>, balance: u64) {
        self.accounts.insert(key.into(), balance);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.accounts.contains_key(key)
    }

    pub fn balance(&self, key: &str) -> Option<u64> {
        self.accounts.get(key).copied()
    }

    /// Add to an account, opening it at zero if unknown.
    pub fn credit(&mut self, key: &str, amount: u64) {
        let balance = self.accounts.entry(key.to_string()).or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    /// Subtract from a known account.
    pub fn debit(&mut self, key: &str, amount: u64) -> Result<(), BalanceError> {
        let balance = self
            .accounts
            .get_mut(key)
            .ok_or_else(|| BalanceError::UnknownAccount(key.to_string()))?;
        if *balance < amount {
            return Err(BalanceError::Insufficient {
                required: amount,
                available: *balance,
            });
        }
        *balance -= amount;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &u64)> {
        self.accounts.iter()
    }

    /// Sum of all balances.
    pub fn total(&self) -> u64 {
        self.accounts
            .values()
            .fold(0u64, |acc, balance| acc.saturating_add(*balance))
    }
}

impl<K: Into<String>> FromIterator<(K, u64)> for Balances {
    fn from_iter<I: IntoIterator<Item = (K, u64)>>(iter: I) -> Self {
        Self {
            accounts: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}
