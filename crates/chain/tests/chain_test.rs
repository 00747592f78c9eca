use powchain_chain::tamper::{self, Tamper};
use powchain_chain::{
    Blockchain, BlockchainConfig, ChainExport, Ledger, Mempool, MiningSession, RoundOutcome,
    SessionConfig,
};
use powchain_consensus::{AccountRejection, TransactionValidator, UtxoRejection};
use powchain_core::{
    AccountTransaction, Balances, Miner, Transaction, TxOut, UtxoSet, UtxoTransaction,
};
use std::time::Duration;

const BUDGET: Duration = Duration::from_secs(60);

fn config(difficulty: u32) -> BlockchainConfig {
    BlockchainConfig {
        difficulty,
        version: "v0.2".into(),
        batch_size: 3,
        seed: Some(2024),
        ..BlockchainConfig::default()
    }
}

fn miners() -> Vec<Miner> {
    (1..=3)
        .map(|i| Miner::new(format!("Miner{}", i), format!("miner-{}", i)))
        .collect()
}

fn mined_account_chain() -> Blockchain {
    let balances: Balances = [("A", 500), ("B", 500), ("C", 500)].into_iter().collect();
    let mut chain = Blockchain::new(config(2), Ledger::Account(balances));
    let mut pool = Mempool::new();
    pool.extend([
        Transaction::from(AccountTransaction::with_timestamp("A", "B", 10, 1)),
        Transaction::from(AccountTransaction::with_timestamp("B", "C", 20, 2)),
        Transaction::from(AccountTransaction::with_timestamp("C", "A", 30, 3)),
        Transaction::from(AccountTransaction::with_timestamp("A", "C", 40, 4)),
        Transaction::from(AccountTransaction::with_timestamp("B", "A", 50, 5)),
    ]);

    let report = MiningSession::new(
        &mut chain,
        SessionConfig {
            initial_budget: BUDGET,
            ..SessionConfig::default()
        },
    )
    .run(&mut pool, &miners())
    .unwrap();

    assert!(report.blocks_mined >= 2);
    assert!(pool.is_empty());
    chain
}

#[test]
fn test_mined_chain_is_valid() {
    let chain = mined_account_chain();
    assert!(chain.is_valid_chain());

    for block in &chain.blocks()[1..] {
        assert!(block.hash.unwrap().to_hex().starts_with("00"));
        assert!(block.is_valid_proof_of_work());
    }

    // Transfers move value around; rewards add 50 per mined block.
    let mined = chain.len() as u64 - 1;
    assert_eq!(chain.ledger().total_value(), 1_500 + 50 * mined);
}

#[test]
fn test_every_tamper_breaks_the_chain() {
    let chain = mined_account_chain();
    for target in 1..chain.len() {
        for kind in Tamper::ALL {
            let check = tamper::check(chain.blocks(), target, kind).unwrap();
            assert!(check.detected(), "{} on block {} undetected", kind, target);
            assert_eq!(check.error.unwrap().index, target);
        }
    }
    assert!(chain.is_valid_chain());
}

#[test]
fn test_tampering_stored_blocks_in_place() {
    let mut chain = mined_account_chain();
    let original = chain.blocks()[1].clone();

    let tx = &mut chain.blocks_mut()[1].transactions[0];
    *tx.tx_id_mut() = powchain_core::hash(b"not the id");
    assert!(!chain.is_valid_chain());

    chain.blocks_mut()[1] = original;
    assert!(chain.is_valid_chain());
}

#[test]
fn test_export_round_trip_preserves_validity() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chain.json");

    let chain = mined_account_chain();
    chain.export().save(&path).unwrap();

    let loaded = ChainExport::load(&path).unwrap();
    assert_eq!(loaded.length, chain.len());
    let reloaded =
        Blockchain::from_export(loaded, Ledger::Account(Balances::new()), config(2));
    assert_eq!(reloaded.blocks(), chain.blocks());
    assert!(reloaded.is_valid_chain());

    // A broken chain stays broken after a round trip.
    let mut broken = chain.export();
    broken.blocks[1].header.nonce += 1;
    let json = broken.to_json().unwrap();
    let reloaded = ChainExport::from_json(&json).unwrap();
    assert!(!reloaded.is_valid_chain());
}

#[test]
fn test_account_batch_settles_in_order() {
    let balances: Balances = [("A", 100), ("B", 0)].into_iter().collect();
    let batch = vec![
        Transaction::from(AccountTransaction::with_timestamp("A", "B", 60, 1)),
        Transaction::from(AccountTransaction::with_timestamp("A", "B", 50, 2)),
    ];

    let outcome = TransactionValidator::validate_account_batch(&batch, &balances);

    assert_eq!(outcome.accepted, vec![batch[0].clone()]);
    assert_eq!(outcome.rejected.len(), 1);
    assert_eq!(outcome.rejected[0].index, 1);
    assert_eq!(
        outcome.rejected[0].reason,
        AccountRejection::Insufficient {
            required: 50,
            available: 40
        }
    );
    // Validation is speculative.
    assert_eq!(balances.balance("A"), Some(100));
}

#[test]
fn test_utxo_double_spend_in_one_batch() {
    let coinbase = UtxoTransaction::coinbase("M", 50, 1);
    let first = UtxoTransaction::with_timestamp(
        vec![coinbase.outpoint(0)],
        vec![TxOut::new("A", 50)],
        2,
    );
    let second = UtxoTransaction::with_timestamp(
        vec![coinbase.outpoint(0)],
        vec![TxOut::new("B", 50)],
        3,
    );
    let batch: Vec<Transaction> = vec![coinbase.clone().into(), first.into(), second.into()];

    let outcome = TransactionValidator::validate_utxo_batch(&batch, &UtxoSet::new());

    assert_eq!(outcome.accepted.len(), 2);
    assert_eq!(outcome.rejected.len(), 1);
    assert_eq!(
        outcome.rejected[0].reason,
        UtxoRejection::MissingInput(coinbase.outpoint(0))
    );
}

#[test]
fn test_utxo_chain_grows_with_coinbase_only_blocks() {
    let mut chain = Blockchain::new(config(1), Ledger::Utxo(UtxoSet::new()));
    let mut pool = Mempool::new();

    for expected in 1..=3u64 {
        match chain.mine_round(&mut pool, &miners(), BUDGET).unwrap() {
            RoundOutcome::Mined(round) => assert_eq!(round.index, expected),
            other => panic!("expected a mined block, got {:?}", other),
        }
    }

    assert!(chain.is_valid_chain());
    let utxos = chain.ledger().as_utxos().unwrap();
    assert_eq!(utxos.len(), 3);
    assert_eq!(utxos.total_value(), 150);
}
