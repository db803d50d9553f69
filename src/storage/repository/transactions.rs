// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transaction repository: append-only ledger entries and the deposit
//! status machine.
//!
//! ## Constraints
//!
//! - `transaction_references` makes every reference unique
//! - status only ever moves out of `pending`; terminal rows are never rewritten
//! - a deposit credit and its `success` transition commit together

use chrono::Utc;
use redb::{ReadableDatabase, ReadableTable, WriteTransaction};

use super::super::database::{
    get_json, get_str, make_index_key, make_prefix, make_prefix_end, LedgerDatabase, StoreError,
    StoreResult, TRANSACTIONS, TRANSACTION_REFERENCES, WALLETS, WALLET_TX_INDEX,
};
use crate::models::{Metadata, Transaction, TransactionStatus, TransactionType, Wallet};

/// Provider verdict carried by a webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementOutcome {
    Succeeded,
    Failed,
    StillPending,
}

/// What a settlement attempt did.
#[derive(Debug, Clone, PartialEq)]
pub enum Settlement {
    /// No deposit carries this reference.
    UnknownReference,
    /// The deposit was already terminal; nothing changed.
    AlreadySettled(Transaction),
    /// Wallet credited and deposit marked `success`.
    Credited { transaction: Transaction, balance: u64 },
    /// Deposit marked `failed`.
    Failed(Transaction),
    /// Metadata refreshed, status left `pending`.
    StillPending(Transaction),
}

/// Persistence for ledger entries.
pub trait TransactionRepository: Send + Sync {
    /// Insert a new record. Fails with `StoreError::Conflict` on a reused reference.
    fn insert_transaction(&self, transaction: &Transaction) -> StoreResult<()>;

    fn find_by_reference(&self, reference: &str) -> StoreResult<Option<Transaction>>;

    /// All records of a wallet, newest first.
    fn list_by_wallet(&self, wallet_id: &str) -> StoreResult<Vec<Transaction>>;

    /// Store provider metadata on a still-pending record.
    fn attach_metadata(&self, reference: &str, metadata: Metadata) -> StoreResult<Transaction>;

    /// Move a pending record to `failed`.
    fn mark_failed(&self, reference: &str) -> StoreResult<Transaction>;

    /// Apply a provider verdict to a pending deposit.
    ///
    /// The status check, the balance credit and the status transition happen
    /// in one write transaction, so redelivered webhooks credit at most once.
    fn settle_deposit(
        &self,
        reference: &str,
        outcome: SettlementOutcome,
        metadata: Metadata,
    ) -> StoreResult<Settlement>;
}

/// Write a transaction row plus its reference and wallet index entries.
pub(crate) fn write_transaction_rows(
    write_txn: &WriteTransaction,
    transaction: &Transaction,
) -> StoreResult<()> {
    let mut references = write_txn.open_table(TRANSACTION_REFERENCES)?;
    if references.get(transaction.reference.as_str())?.is_some() {
        return Err(StoreError::Conflict(format!(
            "Transaction reference {}",
            transaction.reference
        )));
    }
    references.insert(transaction.reference.as_str(), transaction.id.as_str())?;

    let mut rows = write_txn.open_table(TRANSACTIONS)?;
    rows.insert(
        transaction.id.as_str(),
        serde_json::to_vec(transaction)?.as_slice(),
    )?;

    let mut index = write_txn.open_table(WALLET_TX_INDEX)?;
    let key = make_index_key(
        &transaction.wallet_id,
        transaction.created_at.timestamp_micros(),
        &transaction.id,
    );
    index.insert(key.as_slice(), transaction.id.as_str())?;
    Ok(())
}

/// Load the record behind a reference inside a write transaction.
fn load_by_reference(
    write_txn: &WriteTransaction,
    reference: &str,
) -> StoreResult<Option<Transaction>> {
    let references = write_txn.open_table(TRANSACTION_REFERENCES)?;
    let Some(id) = get_str(&references, reference)? else {
        return Ok(None);
    };
    let rows = write_txn.open_table(TRANSACTIONS)?;
    get_json(&rows, &id)
}

fn store_row(write_txn: &WriteTransaction, transaction: &Transaction) -> StoreResult<()> {
    let mut rows = write_txn.open_table(TRANSACTIONS)?;
    rows.insert(
        transaction.id.as_str(),
        serde_json::to_vec(transaction)?.as_slice(),
    )?;
    Ok(())
}

impl LedgerDatabase {
    /// Mutate a pending record; refuses terminal ones.
    fn update_pending(
        &self,
        reference: &str,
        mutate: impl FnOnce(&mut Transaction),
    ) -> StoreResult<Transaction> {
        let write_txn = self.db().begin_write()?;
        let mut transaction = load_by_reference(&write_txn, reference)?
            .ok_or_else(|| StoreError::NotFound(format!("Transaction {reference}")))?;

        if transaction.status.is_terminal() {
            return Err(StoreError::InvalidState(format!(
                "Transaction {reference} is already {:?}",
                transaction.status
            )));
        }

        mutate(&mut transaction);
        transaction.updated_at = Utc::now();
        store_row(&write_txn, &transaction)?;
        write_txn.commit()?;
        Ok(transaction)
    }
}

impl TransactionRepository for LedgerDatabase {
    fn insert_transaction(&self, transaction: &Transaction) -> StoreResult<()> {
        let write_txn = self.db().begin_write()?;
        write_transaction_rows(&write_txn, transaction)?;
        write_txn.commit()?;
        Ok(())
    }

    fn find_by_reference(&self, reference: &str) -> StoreResult<Option<Transaction>> {
        let read_txn = self.db().begin_read()?;
        let references = read_txn.open_table(TRANSACTION_REFERENCES)?;
        let Some(id) = get_str(&references, reference)? else {
            return Ok(None);
        };
        let rows = read_txn.open_table(TRANSACTIONS)?;
        get_json(&rows, &id)
    }

    fn list_by_wallet(&self, wallet_id: &str) -> StoreResult<Vec<Transaction>> {
        let read_txn = self.db().begin_read()?;
        let index = read_txn.open_table(WALLET_TX_INDEX)?;
        let rows = read_txn.open_table(TRANSACTIONS)?;

        let prefix = make_prefix(wallet_id);
        let prefix_end = make_prefix_end(wallet_id);

        let mut transactions = Vec::new();
        for entry in index.range(prefix.as_slice()..prefix_end.as_slice())? {
            let (_, id) = entry?;
            match get_json::<Transaction>(&rows, id.value())? {
                Some(transaction) => transactions.push(transaction),
                None => tracing::warn!(
                    wallet_id = %wallet_id,
                    transaction_id = %id.value(),
                    "Index entry points at a missing transaction"
                ),
            }
        }
        Ok(transactions)
    }

    fn attach_metadata(&self, reference: &str, metadata: Metadata) -> StoreResult<Transaction> {
        self.update_pending(reference, |transaction| {
            transaction.metadata = Some(metadata);
        })
    }

    fn mark_failed(&self, reference: &str) -> StoreResult<Transaction> {
        self.update_pending(reference, |transaction| {
            transaction.status = TransactionStatus::Failed;
        })
    }

    fn settle_deposit(
        &self,
        reference: &str,
        outcome: SettlementOutcome,
        metadata: Metadata,
    ) -> StoreResult<Settlement> {
        let write_txn = self.db().begin_write()?;

        let Some(mut transaction) = load_by_reference(&write_txn, reference)? else {
            return Ok(Settlement::UnknownReference);
        };
        if transaction.kind != TransactionType::Deposit {
            return Ok(Settlement::UnknownReference);
        }
        if transaction.status.is_terminal() {
            return Ok(Settlement::AlreadySettled(transaction));
        }

        let now = Utc::now();
        transaction.metadata = Some(metadata);
        transaction.updated_at = now;

        let settlement = match outcome {
            SettlementOutcome::Succeeded => {
                let mut wallets = write_txn.open_table(WALLETS)?;
                let mut wallet: Wallet = get_json(&wallets, &transaction.wallet_id)?
                    .ok_or_else(|| {
                        StoreError::NotFound(format!("Wallet {}", transaction.wallet_id))
                    })?;
                wallet.balance = wallet
                    .balance
                    .checked_add(transaction.amount)
                    .ok_or_else(|| {
                        StoreError::InvalidState(format!("balance overflow on wallet {}", wallet.id))
                    })?;
                wallet.updated_at = now;
                wallets.insert(wallet.id.as_str(), serde_json::to_vec(&wallet)?.as_slice())?;

                transaction.status = TransactionStatus::Success;
                Settlement::Credited {
                    transaction: transaction.clone(),
                    balance: wallet.balance,
                }
            }
            SettlementOutcome::Failed => {
                transaction.status = TransactionStatus::Failed;
                Settlement::Failed(transaction.clone())
            }
            SettlementOutcome::StillPending => Settlement::StillPending(transaction.clone()),
        };

        store_row(&write_txn, &transaction)?;
        write_txn.commit()?;
        Ok(settlement)
    }
}
