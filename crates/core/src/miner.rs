//! Miner identity.

use serde::{Deserialize, Serialize};

/// An external mining participant. Only consumed for reward attribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Miner {
    pub name: String,
    pub key: String,
    /// Account key (or UTXO receiver) credited with rewards.
    pub reward_address: String,
}

impl Miner {
    pub fn new(name: impl Into<String>, key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            name: name.into(),
            reward_address: key.clone(),
            key,
        }
    }
}
