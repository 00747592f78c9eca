//! Proof of Work (PoW) mining.
//!
//! A block is mined by incrementing its header nonce until the header digest
//! starts with `difficulty` zero hex characters. [`mine`] does this on the
//! calling thread; [`MiningRace`] runs one worker per competing miner, each on
//! its own candidate block, and keeps whichever finishes first.

use powchain_core::hash::HEX_LEN;
use powchain_core::{Block, Hash, Miner};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::OnceLock;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Attempts between progress log lines.
pub const PROGRESS_INTERVAL: u64 = 10_000;

/// Errors that can occur while mining.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PowError {
    #[error("difficulty {0} exceeds the digest width of {HEX_LEN} hex characters")]
    UnreachableDifficulty(u32),

    #[error("nonce space exhausted at {0}")]
    NonceExhausted(u64),
}

pub type Result<T> = std::result::Result<T, PowError>;

fn check_difficulty(difficulty: u32) -> Result<()> {
    if difficulty as usize > HEX_LEN {
        return Err(PowError::UnreachableDifficulty(difficulty));
    }
    Ok(())
}

fn advance_nonce(block: &mut Block) -> Result<()> {
    let nonce = block.header.nonce;
    block.header.nonce = nonce
        .checked_add(1)
        .ok_or(PowError::NonceExhausted(nonce))?;
    Ok(())
}

/// Mine `block` on the current thread, starting from its current nonce.
///
/// On success the winning nonce stays in the header and `block.hash` is set.
pub fn mine(block: &mut Block) -> Result<Hash> {
    check_difficulty(block.difficulty())?;
    let mut attempts: u64 = 0;

    loop {
        let digest = block.compute_hash();
        attempts += 1;
        if digest.meets_difficulty(block.difficulty()) {
            block.hash = Some(digest);
            return Ok(digest);
        }
        if attempts % PROGRESS_INTERVAL == 0 {
            tracing::trace!(
                index = block.index,
                nonce = block.header.nonce,
                last_hash = %digest,
                "still mining"
            );
        }
        advance_nonce(block)?;
    }
}

/// Search until found, stopped by another worker, or past the deadline.
///
/// Returns `Ok(None)` when the search was abandoned.
fn search(
    block: &mut Block,
    deadline: Option<Instant>,
    found: &AtomicBool,
    attempts: &mut u64,
) -> Result<Option<Hash>> {
    loop {
        if found.load(Ordering::Acquire) {
            return Ok(None);
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            return Ok(None);
        }

        let digest = block.compute_hash();
        *attempts += 1;
        if digest.meets_difficulty(block.difficulty()) {
            block.hash = Some(digest);
            return Ok(Some(digest));
        }
        advance_nonce(block)?;
    }
}

/// One miner's entry into a race.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub miner: Miner,
    pub block: Block,
}

/// The first candidate to meet the difficulty.
#[derive(Debug, Clone)]
pub struct RaceWinner {
    /// Position of the winner in the candidate list.
    pub candidate_index: usize,
    pub miner: Miner,
    /// The mined block, hash set.
    pub block: Block,
    /// Hashes computed by the winner.
    pub attempts: u64,
}

/// Result of one race.
#[derive(Debug, Clone)]
pub struct RaceOutcome {
    /// `None` when the budget ran out first.
    pub winner: Option<RaceWinner>,
    /// Hashes computed across all workers.
    pub total_attempts: u64,
    pub elapsed: Duration,
}

/// Competitive multi-worker mining with a shared deadline.
///
/// Each worker owns its candidate block and nonce counter. The only shared
/// state is the found flag and the single-slot result, written once by the
/// first worker to succeed. Losers notice the flag on their next iteration
/// and drop their work.
pub struct MiningRace;

impl MiningRace {
    pub fn run(candidates: Vec<Candidate>, budget: Duration) -> Result<RaceOutcome> {
        for candidate in &candidates {
            check_difficulty(candidate.block.difficulty())?;
        }

        let start = Instant::now();
        let deadline = start.checked_add(budget);
        let found = AtomicBool::new(false);
        let slot: OnceLock<RaceWinner> = OnceLock::new();
        let total_attempts = AtomicU64::new(0);

        thread::scope(|scope| {
            for (candidate_index, candidate) in candidates.into_iter().enumerate() {
                let found = &found;
                let slot = &slot;
                let total_attempts = &total_attempts;

                scope.spawn(move || {
                    let Candidate { miner, mut block } = candidate;
                    let mut attempts = 0;

                    match search(&mut block, deadline, found, &mut attempts) {
                        Ok(Some(digest)) => {
                            let won = slot
                                .set(RaceWinner {
                                    candidate_index,
                                    miner,
                                    block,
                                    attempts,
                                })
                                .is_ok();
                            found.store(true, Ordering::Release);
                            if won {
                                tracing::debug!(
                                    candidate_index,
                                    attempts,
                                    hash = %digest,
                                    "worker won the race"
                                );
                            }
                        }
                        Ok(None) => {}
                        Err(err) => {
                            tracing::warn!(candidate_index, error = %err, "worker gave up");
                        }
                    }

                    total_attempts.fetch_add(attempts, Ordering::Relaxed);
                });
            }
        });

        Ok(RaceOutcome {
            winner: slot.into_inner(),
            total_attempts: total_attempts.into_inner(),
            elapsed: start.elapsed(),
        })
    }
}
