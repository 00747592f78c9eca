//! Main blockchain orchestration.
//!
//! A [`Blockchain`] owns the canonical chain and the canonical ledger. Each
//! call to [`Blockchain::mine_round`] forms one candidate block per miner,
//! races them, verifies the winner, and only then appends it and mutates the
//! ledger. Nothing is appended or applied for a round that fails.

use crate::executor::{ApplyReport, Executor, Ledger};
use crate::mempool::Mempool;
use powchain_consensus::{
    BlockValidator, Candidate, ChainValidationError, MiningRace, PowError, RaceWinner,
    TransactionValidator, ValidationError,
};
use powchain_core::{
    current_timestamp, Block, Hash, Miner, Transaction, UtxoTransaction, DEFAULT_VERSION,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during blockchain operations.
#[derive(Debug, Error)]
pub enum BlockchainError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("mining error: {0}")]
    Pow(#[from] PowError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("export declares {declared} blocks but contains {actual}")]
    LengthMismatch { declared: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, BlockchainError>;

/// Blockchain configuration.
#[derive(Debug, Clone)]
pub struct BlockchainConfig {
    /// Required leading zero hex characters for every mined block.
    pub difficulty: u32,
    /// Version stamped on every block.
    pub version: String,
    /// Fixed payout to the winning miner.
    pub block_reward: u64,
    /// Maximum pooled transactions sampled per candidate.
    pub batch_size: usize,
    /// Seed for pool sampling. `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for BlockchainConfig {
    fn default() -> Self {
        Self {
            difficulty: 3,
            version: DEFAULT_VERSION.to_string(),
            block_reward: 50,
            batch_size: 100,
            seed: None,
        }
    }
}

/// A block that won its round and was applied.
#[derive(Debug, Clone)]
pub struct MinedRound {
    pub index: u64,
    pub hash: Hash,
    pub miner: Miner,
    /// Transactions in the block, coinbase included.
    pub tx_count: usize,
    /// Transactions removed from the pool.
    pub removed_from_pool: usize,
    /// Reward credited to the miner's account (account model only).
    pub reward_credited: u64,
    pub apply: ApplyReport,
    /// Hashes computed across all workers in the race.
    pub attempts: u64,
    pub elapsed: Duration,
}

/// How a mining round ended.
#[derive(Debug, Clone)]
pub enum RoundOutcome {
    /// A block was mined, verified, appended and applied.
    Mined(MinedRound),
    /// No worker met the difficulty within the budget.
    Timeout { attempts: u64, elapsed: Duration },
    /// The winning block failed verification and was discarded.
    Rejected(ValidationError),
    /// No miner had a single valid transaction to mine.
    NoCandidates,
}

impl RoundOutcome {
    pub fn is_mined(&self) -> bool {
        matches!(self, RoundOutcome::Mined(_))
    }
}

/// Main blockchain struct that orchestrates all components.
pub struct Blockchain {
    /// Configuration.
    config: BlockchainConfig,
    /// Blocks, genesis first.
    chain: Vec<Block>,
    /// Canonical ledger state.
    ledger: Ledger,
    /// Pool sampling.
    rng: StdRng,
}

impl Blockchain {
    /// Create an empty blockchain over the given ledger.
    pub fn new(config: BlockchainConfig, ledger: Ledger) -> Self {
        Self::from_blocks(config, ledger, Vec::new())
    }

    /// Rebuild a blockchain from existing blocks, as loaded. Hashes are kept
    /// verbatim and nothing is re-verified or re-applied.
    pub fn from_blocks(config: BlockchainConfig, ledger: Ledger, blocks: Vec<Block>) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            config,
            chain: blocks,
            ledger,
            rng,
        }
    }

    pub fn config(&self) -> &BlockchainConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn blocks(&self) -> &[Block] {
        &self.chain
    }

    /// Direct mutable access to stored blocks, for tamper testing.
    pub fn blocks_mut(&mut self) -> &mut [Block] {
        &mut self.chain
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Get the latest block.
    pub fn last_block(&self) -> Option<&Block> {
        self.chain.last()
    }

    /// Index of the tip, `None` before genesis.
    pub fn height(&self) -> Option<u64> {
        self.chain.last().map(|block| block.index)
    }

    /// Create the genesis block if the chain is empty.
    pub fn ensure_genesis(&mut self) -> &Block {
        if self.chain.is_empty() {
            let genesis = Block::genesis(self.config.version.clone(), self.config.difficulty);
            tracing::info!(hash = %genesis.hash.unwrap_or_default(), "genesis block created");
            self.chain.push(genesis);
        }
        &self.chain[0]
    }

    /// Verify `block` as the successor of `parent` (or as a first block).
    pub fn verify_block(&self, block: &Block, parent: Option<&Block>) -> Result<()> {
        BlockValidator::validate_full(block, parent)?;
        Ok(())
    }

    /// Verify and append a block without touching the ledger.
    pub fn add_block(&mut self, block: Block) -> Result<()> {
        self.verify_block(&block, self.chain.last())?;
        self.chain.push(block);
        Ok(())
    }

    /// Check every link, proof of work, merkle root and transaction id.
    pub fn validate_chain(&self) -> std::result::Result<(), ChainValidationError> {
        BlockValidator::validate_chain(&self.chain)
    }

    pub fn is_valid_chain(&self) -> bool {
        self.validate_chain().is_ok()
    }

    /// Timestamp for the next block, strictly after the current tip.
    ///
    /// Coinbase ids cover only receiver, amount and timestamp, so two
    /// coinbases to one miner within a second would otherwise collide.
    fn next_timestamp(&self) -> u64 {
        let now = current_timestamp();
        match self.chain.last() {
            Some(tip) => now.max(tip.header.timestamp.saturating_add(1)),
            None => now,
        }
    }

    /// Build one candidate block per miner from independently sampled and
    /// speculatively validated batches. Miners with nothing valid sit out.
    pub fn form_candidates(&mut self, pool: &Mempool, miners: &[Miner]) -> Vec<Candidate> {
        let (index, prev_hash) = match self.chain.last() {
            Some(tip) => (tip.index.saturating_add(1), tip.hash.unwrap_or(Hash::ZERO)),
            None => (0, Hash::ZERO),
        };
        let timestamp = self.next_timestamp();
        let mut candidates = Vec::with_capacity(miners.len());

        for miner in miners {
            let sampled = pool.sample(self.config.batch_size, &mut self.rng);

            let (accepted, rejected) = match &self.ledger {
                Ledger::Account(balances) => {
                    let outcome = TransactionValidator::validate_account_batch(&sampled, balances);
                    (outcome.accepted, outcome.rejected.len())
                }
                Ledger::Utxo(utxos) => {
                    let coinbase = UtxoTransaction::coinbase(
                        miner.reward_address.clone(),
                        self.config.block_reward,
                        timestamp,
                    );
                    let mut batch: Vec<Transaction> = Vec::with_capacity(sampled.len() + 1);
                    batch.push(coinbase.into());
                    batch.extend(sampled);
                    let outcome = TransactionValidator::validate_utxo_batch(&batch, utxos);
                    (outcome.accepted, outcome.rejected.len())
                }
            };

            tracing::debug!(
                miner = %miner.name,
                accepted = accepted.len(),
                rejected,
                "candidate batch validated"
            );

            if accepted.is_empty() {
                continue;
            }

            let mut block = Block::new(
                index,
                prev_hash,
                accepted,
                self.config.version.clone(),
                self.config.difficulty,
            );
            block.header.timestamp = timestamp;
            candidates.push(Candidate {
                miner: miner.clone(),
                block,
            });
        }

        candidates
    }

    /// Run one mining round.
    ///
    /// Rejections, timeouts and empty rounds are reported as outcomes; only
    /// an unmineable configuration is an error.
    pub fn mine_round(
        &mut self,
        pool: &mut Mempool,
        miners: &[Miner],
        budget: Duration,
    ) -> Result<RoundOutcome> {
        self.ensure_genesis();

        let candidates = self.form_candidates(pool, miners);
        if candidates.is_empty() {
            tracing::info!("no miner has a valid transaction to mine");
            return Ok(RoundOutcome::NoCandidates);
        }

        let race = MiningRace::run(candidates, budget)?;
        let Some(winner) = race.winner else {
            tracing::info!(
                budget_ms = budget.as_millis() as u64,
                attempts = race.total_attempts,
                "no block found within the time budget"
            );
            return Ok(RoundOutcome::Timeout {
                attempts: race.total_attempts,
                elapsed: race.elapsed,
            });
        };

        match self.accept_winner(pool, winner) {
            Ok(mut round) => {
                round.attempts = race.total_attempts;
                round.elapsed = race.elapsed;
                Ok(RoundOutcome::Mined(round))
            }
            Err(err) => Ok(RoundOutcome::Rejected(err)),
        }
    }

    /// Verify a race winner against the tip, then append it, apply it to the
    /// ledger, pay the reward and remove its transactions from the pool.
    ///
    /// A winner that fails verification is discarded: the chain, ledger and
    /// pool are left exactly as they were. The returned round carries the
    /// winner's own attempts and a zero elapsed time.
    pub fn accept_winner(
        &mut self,
        pool: &mut Mempool,
        winner: RaceWinner,
    ) -> std::result::Result<MinedRound, ValidationError> {
        let block = winner.block;
        if let Err(err) = BlockValidator::validate_full(&block, self.chain.last()) {
            tracing::warn!(
                index = block.index,
                miner = %winner.miner.name,
                error = %err,
                "mined block rejected"
            );
            return Err(err);
        }

        let hash = block.hash.unwrap_or_default();
        let mined_ids: Vec<Hash> = block
            .transactions
            .iter()
            .filter(|tx| !tx.is_coinbase())
            .map(|tx| tx.tx_id())
            .collect();
        self.chain.push(block);
        let block = &self.chain[self.chain.len() - 1];

        let mut executor = Executor::new(&mut self.ledger);
        let apply = executor.execute_block(block);

        // Transactions carry no fees, so the payout is the block reward alone.
        let reward = self.config.block_reward;
        let reward_credited = if executor.credit_reward(&winner.miner.reward_address, reward) {
            reward
        } else {
            0
        };
        let removed_from_pool = pool.remove_batch(&mined_ids);

        tracing::info!(
            index = block.index,
            %hash,
            nonce = block.header.nonce,
            miner = %winner.miner.name,
            txs = block.tx_count(),
            pool_left = pool.len(),
            "block mined and added"
        );

        Ok(MinedRound {
            index: block.index,
            hash,
            miner: winner.miner,
            tx_count: block.tx_count(),
            removed_from_pool,
            reward_credited,
            apply,
            attempts: winner.attempts,
            elapsed: Duration::ZERO,
        })
    }

    /// Number of pooled transactions that validate, in pool order, against
    /// the live ledger.
    pub fn revalidate_pool(&self, pool: &Mempool) -> usize {
        let all = pool.get_all();
        match &self.ledger {
            Ledger::Account(balances) => {
                TransactionValidator::validate_account_batch(&all, balances)
                    .accepted
                    .len()
            }
            Ledger::Utxo(utxos) => TransactionValidator::validate_utxo_batch(&all, utxos)
                .accepted
                .len(),
        }
    }

    /// Drop pooled UTXO transactions that can no longer validate against the
    /// live set (spent or unknown inputs, overspends, bad ids). Returns how
    /// many were dropped. Account-model pools are left alone.
    pub fn prune_stale(&self, pool: &mut Mempool) -> usize {
        let Ledger::Utxo(utxos) = &self.ledger else {
            return 0;
        };
        let stale: Vec<Hash> = TransactionValidator::validate_utxo_batch(&pool.get_all(), utxos)
            .rejected
            .into_iter()
            .map(|r| r.tx_id)
            .collect();
        pool.remove_batch(&stale)
    }

    /// Get blockchain statistics.
    pub fn stats(&self) -> BlockchainStats {
        let latest = self.chain.last();
        BlockchainStats {
            length: self.chain.len(),
            latest_block_hash: latest.and_then(|b| b.hash),
            latest_timestamp: latest.map(|b| b.header.timestamp),
            transactions: self.chain.iter().map(Block::tx_count).sum(),
            ledger_model: self.ledger.model_name(),
            ledger_entries: self.ledger.size(),
            ledger_value: self.ledger.total_value(),
        }
    }
}

/// Blockchain statistics.
#[derive(Debug, Clone)]
pub struct BlockchainStats {
    /// Number of blocks, genesis included.
    pub length: usize,
    pub latest_block_hash: Option<Hash>,
    pub latest_timestamp: Option<u64>,
    /// Transactions across all blocks.
    pub transactions: usize,
    pub ledger_model: &'static str,
    /// Accounts or unspent outputs.
    pub ledger_entries: usize,
    pub ledger_value: u64,
}
