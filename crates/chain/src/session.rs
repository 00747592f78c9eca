//! Repeated mining rounds with back-off.
//!
//! A session keeps mining until the pool drains and the requested number of
//! blocks exists. A round with no winner doubles the time budget (up to a
//! cap). When, in the account model, nothing left in the pool validates, the
//! pool is purged and the session ends.

use crate::blockchain::{Blockchain, Result, RoundOutcome};
use crate::mempool::Mempool;
use powchain_core::Miner;
use std::time::Duration;

/// Mining session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Time budget of the first round.
    pub initial_budget: Duration,
    /// Cap for the doubled budget.
    pub max_budget: Duration,
    /// Hard stop on rounds, mined or not.
    pub max_rounds: usize,
    /// Keep mining until at least this many blocks were mined in the
    /// session, even with an empty pool (UTXO coinbase-only blocks).
    pub target_blocks: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            initial_budget: Duration::from_millis(500),
            max_budget: Duration::from_secs(60),
            max_rounds: 1_000,
            target_blocks: 0,
        }
    }
}

/// Summary of a finished session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionReport {
    pub rounds: usize,
    pub blocks_mined: usize,
    /// Rounds with no winner in time.
    pub timeouts: usize,
    /// Rounds whose winning block failed verification.
    pub rejected: usize,
    /// Transactions dropped from the pool without being mined.
    pub dropped: usize,
    /// Whether the session gave up on an unmineable pool.
    pub purged: bool,
    pub final_budget: Duration,
}

/// Drives mining rounds on a chain.
pub struct MiningSession<'a> {
    chain: &'a mut Blockchain,
    config: SessionConfig,
}

impl<'a> MiningSession<'a> {
    pub fn new(chain: &'a mut Blockchain, config: SessionConfig) -> Self {
        Self { chain, config }
    }

    fn wants_more(&self, pool: &Mempool, report: &SessionReport) -> bool {
        !pool.is_empty() || report.blocks_mined < self.config.target_blocks
    }

    pub fn run(&mut self, pool: &mut Mempool, miners: &[Miner]) -> Result<SessionReport> {
        let mut budget = self.config.initial_budget;
        let mut report = SessionReport::default();

        if miners.is_empty() {
            tracing::warn!("mining session started without miners");
            report.final_budget = budget;
            return Ok(report);
        }

        while report.rounds < self.config.max_rounds && self.wants_more(pool, &report) {
            report.rounds += 1;

            match self.chain.mine_round(pool, miners, budget)? {
                RoundOutcome::Mined(_) => {
                    report.blocks_mined += 1;
                    report.dropped += self.chain.prune_stale(pool);
                }
                outcome @ (RoundOutcome::Timeout { .. } | RoundOutcome::Rejected(_)) => {
                    if matches!(outcome, RoundOutcome::Rejected(_)) {
                        report.rejected += 1;
                    } else {
                        report.timeouts += 1;
                    }
                    budget = (budget * 2).min(self.config.max_budget);
                    tracing::info!(
                        budget_ms = budget.as_millis() as u64,
                        "retrying with a larger budget"
                    );
                }
                RoundOutcome::NoCandidates => {
                    if self.chain.revalidate_pool(pool) == 0 {
                        tracing::warn!(
                            pool = pool.len(),
                            "nothing in the pool validates, purging it"
                        );
                        report.dropped += pool.len();
                        report.purged = true;
                        pool.clear();
                        break;
                    }
                }
            }
        }

        report.final_budget = budget;
        Ok(report)
    }
}
