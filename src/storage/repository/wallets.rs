// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet repository.
//!
//! ## Constraints
//!
//! - `wallet_owners` enforces at most one wallet per user
//! - `wallet_numbers` enforces globally unique wallet numbers
//! - balances are `u64`; a debit that would go below zero is refused inside
//!   the same write transaction that applies it

use chrono::Utc;
use redb::{ReadableDatabase, ReadableTable};

use super::super::database::{
    get_json, get_str, LedgerDatabase, StoreError, StoreResult, WALLETS, WALLET_NUMBERS,
    WALLET_OWNERS,
};
use super::transactions::write_transaction_rows;
use crate::models::{Transaction, Wallet};

/// Post-transfer balances of both sides.
#[derive(Debug, Clone)]
pub struct TransferBalances {
    pub sender: Wallet,
    pub recipient: Wallet,
}

/// Persistence for wallets and balance mutations.
pub trait WalletRepository: Send + Sync {
    fn find_by_id(&self, wallet_id: &str) -> StoreResult<Option<Wallet>>;

    fn find_by_user(&self, user_id: &str) -> StoreResult<Option<Wallet>>;

    fn find_by_number(&self, wallet_number: &str) -> StoreResult<Option<Wallet>>;

    /// Insert a new wallet.
    ///
    /// Fails with `StoreError::Conflict` if the user already owns a wallet or
    /// the wallet number is taken.
    fn create_wallet(&self, wallet: &Wallet) -> StoreResult<()>;

    /// Apply both legs of a transfer as one unit.
    ///
    /// Re-reads the sender balance under the write lock, debits the sender,
    /// credits the recipient and inserts both transaction records. Nothing is
    /// written unless everything succeeds.
    fn commit_transfer(&self, debit: &Transaction, credit: &Transaction)
        -> StoreResult<TransferBalances>;
}

impl LedgerDatabase {
    fn find_wallet_via(
        &self,
        index: redb::TableDefinition<'static, &'static str, &'static str>,
        key: &str,
    ) -> StoreResult<Option<Wallet>> {
        let read_txn = self.db().begin_read()?;
        let index_table = read_txn.open_table(index)?;
        let Some(wallet_id) = get_str(&index_table, key)? else {
            return Ok(None);
        };
        let wallets = read_txn.open_table(WALLETS)?;
        get_json(&wallets, &wallet_id)
    }
}

impl WalletRepository for LedgerDatabase {
    fn find_by_id(&self, wallet_id: &str) -> StoreResult<Option<Wallet>> {
        let read_txn = self.db().begin_read()?;
        let wallets = read_txn.open_table(WALLETS)?;
        get_json(&wallets, wallet_id)
    }

    fn find_by_user(&self, user_id: &str) -> StoreResult<Option<Wallet>> {
        self.find_wallet_via(WALLET_OWNERS, user_id)
    }

    fn find_by_number(&self, wallet_number: &str) -> StoreResult<Option<Wallet>> {
        self.find_wallet_via(WALLET_NUMBERS, wallet_number)
    }

    fn create_wallet(&self, wallet: &Wallet) -> StoreResult<()> {
        let json = serde_json::to_vec(wallet)?;

        let write_txn = self.db().begin_write()?;
        {
            let mut owners = write_txn.open_table(WALLET_OWNERS)?;
            if owners.get(wallet.user_id.as_str())?.is_some() {
                return Err(StoreError::Conflict(format!(
                    "Wallet for user {}",
                    wallet.user_id
                )));
            }

            let mut numbers = write_txn.open_table(WALLET_NUMBERS)?;
            if numbers.get(wallet.wallet_number.as_str())?.is_some() {
                return Err(StoreError::Conflict(format!(
                    "Wallet number {}",
                    wallet.wallet_number
                )));
            }

            let mut wallets = write_txn.open_table(WALLETS)?;
            wallets.insert(wallet.id.as_str(), json.as_slice())?;
            owners.insert(wallet.user_id.as_str(), wallet.id.as_str())?;
            numbers.insert(wallet.wallet_number.as_str(), wallet.id.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn commit_transfer(
        &self,
        debit: &Transaction,
        credit: &Transaction,
    ) -> StoreResult<TransferBalances> {
        if debit.amount != credit.amount || debit.wallet_id == credit.wallet_id {
            return Err(StoreError::InvalidState(
                "transfer legs must share an amount and name two wallets".to_string(),
            ));
        }
        let amount = debit.amount;

        let write_txn = self.db().begin_write()?;
        let balances = {
            let mut wallets = write_txn.open_table(WALLETS)?;

            let mut sender: Wallet = get_json(&wallets, &debit.wallet_id)?
                .ok_or_else(|| StoreError::NotFound(format!("Wallet {}", debit.wallet_id)))?;
            let mut recipient: Wallet = get_json(&wallets, &credit.wallet_id)?
                .ok_or_else(|| StoreError::NotFound(format!("Wallet {}", credit.wallet_id)))?;

            if sender.balance < amount {
                return Err(StoreError::InsufficientFunds {
                    available: sender.balance,
                    requested: amount,
                });
            }
            let credited = recipient.balance.checked_add(amount).ok_or_else(|| {
                StoreError::InvalidState(format!("balance overflow on wallet {}", recipient.id))
            })?;

            let now = Utc::now();
            sender.balance -= amount;
            sender.updated_at = now;
            recipient.balance = credited;
            recipient.updated_at = now;

            wallets.insert(sender.id.as_str(), serde_json::to_vec(&sender)?.as_slice())?;
            wallets.insert(
                recipient.id.as_str(),
                serde_json::to_vec(&recipient)?.as_slice(),
            )?;

            write_transaction_rows(&write_txn, debit)?;
            write_transaction_rows(&write_txn, credit)?;

            TransferBalances { sender, recipient }
        };
        write_txn.commit()?;
        Ok(balances)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionStatus;
    use crate::storage::database::temp_db;
    use crate::storage::TransactionRepository;

    /// Seed a wallet with a balance by writing the row directly.
    fn seed(db: &LedgerDatabase, user_id: &str, balance: u64) -> Wallet {
        let mut wallet = Wallet::new(user_id);
        wallet.balance = balance;
        db.create_wallet(&wallet).unwrap();
        wallet
    }

    #[test]
    fn insert_and_find_by_every_handle() {
        let (db, _dir) = temp_db();
        let wallet = seed(&db, "user-1", 0);

        assert_eq!(db.find_by_id(&wallet.id).unwrap(), Some(wallet.clone()));
        assert_eq!(db.find_by_user("user-1").unwrap(), Some(wallet.clone()));
        assert_eq!(
            db.find_by_number(&wallet.wallet_number).unwrap(),
            Some(wallet.clone())
        );
        assert_eq!(db.find_by_user("user-2").unwrap(), None);
    }

    #[test]
    fn second_wallet_for_same_user_conflicts() {
        let (db, _dir) = temp_db();
        seed(&db, "user-1", 0);

        let result = db.create_wallet(&Wallet::new("user-1"));
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[test]
    fn duplicate_wallet_number_conflicts() {
        let (db, _dir) = temp_db();
        let first = seed(&db, "user-1", 0);

        let mut second = Wallet::new("user-2");
        second.wallet_number = first.wallet_number.clone();
        assert!(matches!(db.create_wallet(&second), Err(StoreError::Conflict(_))));
        assert_eq!(db.find_by_user("user-2").unwrap(), None);
    }

    #[test]
    fn commit_transfer_moves_balance_and_records_both_legs() {
        let (db, _dir) = temp_db();
        let alice = seed(&db, "alice", 1000);
        let bob = seed(&db, "bob", 0);

        let (debit, credit) = Transaction::transfer_pair(&alice.id, &bob.id, 300);
        let balances = db.commit_transfer(&debit, &credit).unwrap();

        assert_eq!(balances.sender.balance, 700);
        assert_eq!(balances.recipient.balance, 300);
        assert_eq!(db.find_by_id(&alice.id).unwrap().unwrap().balance, 700);
        assert_eq!(db.find_by_id(&bob.id).unwrap().unwrap().balance, 300);

        let out = db.find_by_reference(&debit.reference).unwrap().unwrap();
        assert_eq!(out.status, TransactionStatus::Success);
        assert_eq!(out.counterparty_wallet_id.as_deref(), Some(bob.id.as_str()));
    }

    #[test]
    fn insufficient_funds_leaves_everything_untouched() {
        let (db, _dir) = temp_db();
        let alice = seed(&db, "alice", 100);
        let bob = seed(&db, "bob", 5);

        let (debit, credit) = Transaction::transfer_pair(&alice.id, &bob.id, 101);
        let result = db.commit_transfer(&debit, &credit);
        assert!(matches!(
            result,
            Err(StoreError::InsufficientFunds {
                available: 100,
                requested: 101
            })
        ));

        assert_eq!(db.find_by_id(&alice.id).unwrap().unwrap().balance, 100);
        assert_eq!(db.find_by_id(&bob.id).unwrap().unwrap().balance, 5);
        assert!(db.find_by_reference(&debit.reference).unwrap().is_none());
        assert!(db.list_by_wallet(&bob.id).unwrap().is_empty());
    }

    #[test]
    fn reused_reference_aborts_the_whole_transfer() {
        let (db, _dir) = temp_db();
        let alice = seed(&db, "alice", 500);
        let bob = seed(&db, "bob", 0);

        let (debit, credit) = Transaction::transfer_pair(&alice.id, &bob.id, 100);
        db.commit_transfer(&debit, &credit).unwrap();

        // Fresh debit, but the credit leg replays an existing reference.
        let (second_debit, mut second_credit) = Transaction::transfer_pair(&alice.id, &bob.id, 100);
        second_credit.reference = credit.reference.clone();
        let result = db.commit_transfer(&second_debit, &second_credit);
        assert!(matches!(result, Err(StoreError::Conflict(_))));

        assert_eq!(db.find_by_id(&alice.id).unwrap().unwrap().balance, 400);
        assert_eq!(db.find_by_id(&bob.id).unwrap().unwrap().balance, 100);
        assert!(db.find_by_reference(&second_debit.reference).unwrap().is_none());
    }

    #[test]
    fn mismatched_legs_are_rejected() {
        let (db, _dir) = temp_db();
        let alice = seed(&db, "alice", 500);
        let bob = seed(&db, "bob", 0);

        let (debit, mut credit) = Transaction::transfer_pair(&alice.id, &bob.id, 100);
        credit.amount = 99;
        assert!(matches!(
            db.commit_transfer(&debit, &credit),
            Err(StoreError::InvalidState(_))
        ));
    }
}
