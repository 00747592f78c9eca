//! Synthetic users and transactions for simulations.

use powchain_core::{
    current_timestamp, hash, AccountTransaction, Balances, Miner, OutPoint, Transaction, TxOut,
    UtxoSet, UtxoTransaction,
};
use rand::Rng;

pub const MIN_BALANCE: u64 = 100;
pub const MAX_BALANCE: u64 = 1_000_000;

/// A simulated participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub name: String,
    /// Ledger identifier: account key or UTXO receiver.
    pub key: String,
    pub balance: u64,
}

impl User {
    pub fn as_miner(&self) -> Miner {
        Miner::new(self.name.clone(), self.key.clone())
    }
}

/// Generate `n` users with salted keys and random starting balances.
pub fn generate_users<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Vec<User> {
    (1..=n)
        .map(|i| {
            let name = format!("User{}", i);
            let salt: u64 = rng.gen();
            let key = hash(format!("{}:{:016x}", name, salt).as_bytes()).to_hex();
            User {
                name,
                key,
                balance: rng.gen_range(MIN_BALANCE..=MAX_BALANCE),
            }
        })
        .collect()
}

/// Opening balances for the account model.
pub fn balances(users: &[User]) -> Balances {
    users
        .iter()
        .map(|user| (user.key.clone(), user.balance))
        .collect()
}

/// Random transfers between distinct users, each for at most the sender's
/// opening balance. Later transfers may well overdraw.
pub fn generate_transfers<R: Rng + ?Sized>(
    users: &[User],
    n: usize,
    rng: &mut R,
) -> Vec<Transaction> {
    if users.len() < 2 {
        return Vec::new();
    }

    let timestamp = current_timestamp();
    (0..n)
        .map(|_| {
            let sender = &users[rng.gen_range(0..users.len())];
            let receiver = loop {
                let candidate = &users[rng.gen_range(0..users.len())];
                if candidate.key != sender.key {
                    break candidate;
                }
            };
            let amount = rng.gen_range(1..=sender.balance.max(1));
            AccountTransaction::with_timestamp(
                sender.key.clone(),
                receiver.key.clone(),
                amount,
                timestamp,
            )
            .into()
        })
        .collect()
}

/// A UTXO set funding every user with one output of their balance, plus `n`
/// spends. Spends may chain off earlier generated spends, so they only
/// validate once their parents are mined or sampled ahead of them.
pub fn generate_utxo_economy<R: Rng + ?Sized>(
    users: &[User],
    n: usize,
    rng: &mut R,
) -> (UtxoSet, Vec<Transaction>) {
    let timestamp = current_timestamp();
    let mut utxos = UtxoSet::new();
    let mut wallets: Vec<Vec<(OutPoint, u64)>> = Vec::with_capacity(users.len());

    for user in users {
        let funding = UtxoTransaction::with_timestamp(
            Vec::new(),
            vec![TxOut::new(user.key.clone(), user.balance)],
            timestamp,
        );
        utxos.add_outputs_of(&funding);
        wallets.push(vec![(funding.outpoint(0), user.balance)]);
    }

    let mut spends = Vec::with_capacity(n);
    if users.len() < 2 {
        return (utxos, spends);
    }

    while spends.len() < n {
        let from = rng.gen_range(0..users.len());
        if wallets[from].is_empty() {
            continue;
        }
        let to = loop {
            let candidate = rng.gen_range(0..users.len());
            if candidate != from {
                break candidate;
            }
        };

        let pick = rng.gen_range(0..wallets[from].len());
        let (coin, value) = wallets[from].swap_remove(pick);
        let amount = rng.gen_range(1..=value);
        let change = value - amount;

        let mut outputs = vec![TxOut::new(users[to].key.clone(), amount)];
        if change > 0 {
            outputs.push(TxOut::new(users[from].key.clone(), change));
        }
        let spend = UtxoTransaction::with_timestamp(vec![coin], outputs, timestamp);

        wallets[to].push((spend.outpoint(0), amount));
        if change > 0 {
            wallets[from].push((spend.outpoint(1), change));
        }
        spends.push(spend.into());
    }

    (utxos, spends)
}

#[cfg(test)]
mod tests {
    use super::*;
    use powchain_consensus::TransactionValidator;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_users_are_distinct_and_funded() {
        let mut rng = StdRng::seed_from_u64(1);
        let users = generate_users(50, &mut rng);

        assert_eq!(users.len(), 50);
        assert_eq!(users[0].name, "User1");
        let keys: HashSet<_> = users.iter().map(|u| &u.key).collect();
        assert_eq!(keys.len(), 50);
        assert!(users
            .iter()
            .all(|u| (MIN_BALANCE..=MAX_BALANCE).contains(&u.balance)));
    }

    #[test]
    fn test_seeded_generation_is_repeatable() {
        let a = generate_users(10, &mut StdRng::seed_from_u64(9));
        let b = generate_users(10, &mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
    }

    #[test]
    fn test_transfers_never_self_send() {
        let mut rng = StdRng::seed_from_u64(2);
        let users = generate_users(5, &mut rng);
        let txs = generate_transfers(&users, 200, &mut rng);

        assert_eq!(txs.len(), 200);
        for tx in &txs {
            let transfer = tx.as_account().unwrap();
            assert_ne!(transfer.sender, transfer.receiver);
            assert!(transfer.amount >= 1);
            assert!(tx.verify_id());
        }
    }

    #[test]
    fn test_first_transfer_validates() {
        let mut rng = StdRng::seed_from_u64(3);
        let users = generate_users(10, &mut rng);
        let txs = generate_transfers(&users, 1, &mut rng);

        let outcome = TransactionValidator::validate_account_batch(&txs, &balances(&users));
        assert_eq!(outcome.accepted.len(), 1);
    }

    #[test]
    fn test_utxo_economy_validates_in_order() {
        let mut rng = StdRng::seed_from_u64(4);
        let users = generate_users(8, &mut rng);
        let (utxos, spends) = generate_utxo_economy(&users, 100, &mut rng);

        assert_eq!(utxos.len(), 8);
        assert_eq!(
            utxos.total_value(),
            users.iter().map(|u| u.balance).sum::<u64>()
        );
        assert_eq!(spends.len(), 100);

        // In generation order every spend finds its input.
        let outcome = TransactionValidator::validate_utxo_batch(&spends, &utxos);
        assert_eq!(outcome.accepted.len(), 100);
        assert!(outcome.rejected.is_empty());
    }

    #[test]
    fn test_single_user_gets_no_transactions() {
        let mut rng = StdRng::seed_from_u64(5);
        let users = generate_users(1, &mut rng);
        assert!(generate_transfers(&users, 10, &mut rng).is_empty());
        let (utxos, spends) = generate_utxo_economy(&users, 10, &mut rng);
        assert_eq!(utxos.len(), 1);
        assert!(spends.is_empty());
    }
}
