// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded ledger database backed by redb (pure Rust, ACID).
//!
//! redb admits a single write transaction at a time, so every multi-row
//! mutation (transfer, deposit settlement, key issuance under the active-key
//! limit) runs its read-check-write sequence inside one write transaction and
//! is serialized against all other writers. Readers see committed snapshots.
//!
//! ## Table Layout
//!
//! - `wallets`: wallet_id → serialized Wallet
//! - `wallet_owners`: user_id → wallet_id (one wallet per user)
//! - `wallet_numbers`: wallet_number → wallet_id
//! - `transactions`: transaction_id → serialized Transaction
//! - `transaction_references`: reference → transaction_id (unique)
//! - `wallet_tx_index`: composite key (wallet_id|!timestamp|tx_id) → tx_id
//! - `api_keys`: key_hash → serialized ApiKey
//! - `api_key_ids`: public_id → key_hash
//! - `api_key_owners`: composite key (owner|!timestamp|public_id) → key_hash
//! - `users`: user_id → serialized UserProfile

use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::de::DeserializeOwned;

// =============================================================================
// Table Definitions
// =============================================================================

pub(crate) const WALLETS: TableDefinition<&str, &[u8]> = TableDefinition::new("wallets");
pub(crate) const WALLET_OWNERS: TableDefinition<&str, &str> = TableDefinition::new("wallet_owners");
pub(crate) const WALLET_NUMBERS: TableDefinition<&str, &str> =
    TableDefinition::new("wallet_numbers");

pub(crate) const TRANSACTIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("transactions");
pub(crate) const TRANSACTION_REFERENCES: TableDefinition<&str, &str> =
    TableDefinition::new("transaction_references");
pub(crate) const WALLET_TX_INDEX: TableDefinition<&[u8], &str> =
    TableDefinition::new("wallet_tx_index");

pub(crate) const API_KEYS: TableDefinition<&str, &[u8]> = TableDefinition::new("api_keys");
pub(crate) const API_KEY_IDS: TableDefinition<&str, &str> = TableDefinition::new("api_key_ids");
pub(crate) const API_KEY_OWNERS: TableDefinition<&[u8], &str> =
    TableDefinition::new("api_key_owners");

pub(crate) const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    /// A uniqueness constraint would be violated.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds { available: u64, requested: u64 },

    #[error("active key limit of {limit} reached")]
    CapacityExceeded { limit: usize },

    /// A guarded transition was attempted from the wrong state.
    #[error("invalid state: {0}")]
    InvalidState(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Index Key Helpers
// =============================================================================

/// Build a composite index key.
///
/// Format: `scope_len (u16 BE) | scope | inverted_timestamp_be | id`
///
/// The length prefix keeps scopes from bleeding into each other and the
/// inverted timestamp yields newest-first ordering on a forward scan.
pub(crate) fn make_index_key(scope: &str, timestamp_micros: i64, id: &str) -> Vec<u8> {
    let mut key = make_prefix(scope);
    key.reserve(8 + id.len());
    key.extend_from_slice(&(!(timestamp_micros as u64)).to_be_bytes());
    key.extend_from_slice(id.as_bytes());
    key
}

/// Prefix covering every index entry of `scope`.
pub(crate) fn make_prefix(scope: &str) -> Vec<u8> {
    let len = u16::try_from(scope.len()).unwrap_or(u16::MAX);
    let mut prefix = Vec::with_capacity(2 + scope.len());
    prefix.extend_from_slice(&len.to_be_bytes());
    prefix.extend_from_slice(scope.as_bytes());
    prefix
}

/// Exclusive upper bound for a prefix scan.
///
/// UTF-8 never contains 0xFF, so no id can sort past eight maximal
/// timestamp bytes followed by one more 0xFF.
pub(crate) fn make_prefix_end(scope: &str) -> Vec<u8> {
    let mut end = make_prefix(scope);
    end.extend_from_slice(&[0xFF; 9]);
    end
}

// =============================================================================
// LedgerDatabase
// =============================================================================

/// Embedded ACID ledger store.
pub struct LedgerDatabase {
    db: Database,
}

impl LedgerDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(WALLETS)?;
            let _ = write_txn.open_table(WALLET_OWNERS)?;
            let _ = write_txn.open_table(WALLET_NUMBERS)?;
            let _ = write_txn.open_table(TRANSACTIONS)?;
            let _ = write_txn.open_table(TRANSACTION_REFERENCES)?;
            let _ = write_txn.open_table(WALLET_TX_INDEX)?;
            let _ = write_txn.open_table(API_KEYS)?;
            let _ = write_txn.open_table(API_KEY_IDS)?;
            let _ = write_txn.open_table(API_KEY_OWNERS)?;
            let _ = write_txn.open_table(USERS)?;
        }
        write_txn.commit()?;

        tracing::info!(path = %path.display(), "Ledger database opened");
        Ok(Self { db })
    }

    pub(crate) fn db(&self) -> &Database {
        &self.db
    }

    /// Readiness check: open a read snapshot and one table.
    pub fn check(&self) -> StoreResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(WALLETS)?;
        Ok(())
    }
}

/// Read and deserialize a JSON row.
pub(crate) fn get_json<T: DeserializeOwned>(
    table: &impl ReadableTable<&'static str, &'static [u8]>,
    key: &str,
) -> StoreResult<Option<T>> {
    match table.get(key)? {
        Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
        None => Ok(None),
    }
}

/// Read a string-valued index row.
pub(crate) fn get_str(
    table: &impl ReadableTable<&'static str, &'static str>,
    key: &str,
) -> StoreResult<Option<String>> {
    Ok(table.get(key)?.map(|value| value.value().to_string()))
}

#[cfg(test)]
pub(crate) fn temp_db() -> (LedgerDatabase, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db = LedgerDatabase::open(&dir.path().join("ledger.redb")).unwrap();
    (db, dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_keys_sort_newest_first() {
        let older = make_index_key("wallet-1", 1_000, "tx-1");
        let newer = make_index_key("wallet-1", 2_000, "tx-2");
        assert!(newer < older, "Newer timestamps should sort first");
    }

    #[test]
    fn index_keys_stay_within_their_scope() {
        let key = make_index_key("ab", i64::MAX, "zzzz");
        assert!(key.as_slice() >= make_prefix("ab").as_slice());
        assert!(key.as_slice() < make_prefix_end("ab").as_slice());

        // A scope that extends another must not fall into its range.
        let other = make_index_key("abc", 0, "id");
        assert!(
            other.as_slice() >= make_prefix_end("ab").as_slice()
                || other.as_slice() < make_prefix("ab").as_slice()
        );
    }

    #[test]
    fn fresh_database_passes_check() {
        let (db, _dir) = temp_db();
        db.check().unwrap();
    }

    #[test]
    fn open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ledger.redb");
        LedgerDatabase::open(&path).unwrap();
        assert!(path.exists());
    }
}
