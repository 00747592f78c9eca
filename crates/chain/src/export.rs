//! JSON export and reload of a chain snapshot.
//!
//! Stored block hashes are written and read back verbatim, never recomputed,
//! so a reloaded chain validates exactly as the exported one did, and a file
//! edited by hand is caught by validation rather than silently repaired.

use crate::blockchain::{Blockchain, BlockchainConfig, BlockchainError, Result};
use crate::executor::Ledger;
use powchain_consensus::BlockValidator;
use powchain_core::Block;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Serialized form of a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainExport {
    pub difficulty: u32,
    pub version: String,
    pub length: usize,
    pub blocks: Vec<Block>,
}

impl ChainExport {
    pub fn from_chain(chain: &Blockchain) -> Self {
        Self {
            difficulty: chain.config().difficulty,
            version: chain.config().version.clone(),
            length: chain.len(),
            blocks: chain.blocks().to_vec(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse an export, checking the declared length against the blocks.
    pub fn from_json(json: &str) -> Result<Self> {
        let export: Self = serde_json::from_str(json)?;
        if export.length != export.blocks.len() {
            return Err(BlockchainError::LengthMismatch {
                declared: export.length,
                actual: export.blocks.len(),
            });
        }
        Ok(export)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path.as_ref(), self.to_json()?)?;
        tracing::info!(path = %path.as_ref().display(), blocks = self.length, "chain exported");
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path.as_ref())?;
        Self::from_json(&json)
    }

    pub fn is_valid_chain(&self) -> bool {
        BlockValidator::is_valid_chain(&self.blocks)
    }
}

impl Blockchain {
    pub fn export(&self) -> ChainExport {
        ChainExport::from_chain(self)
    }

    /// Rebuild a chain from an export. Difficulty and version come from the
    /// export; the ledger is supplied by the caller since it is not exported.
    pub fn from_export(export: ChainExport, ledger: Ledger, base: BlockchainConfig) -> Self {
        let config = BlockchainConfig {
            difficulty: export.difficulty,
            version: export.version,
            ..base
        };
        Blockchain::from_blocks(config, ledger, export.blocks)
    }
}
