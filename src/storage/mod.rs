// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistent ledger state lives in a single redb file under `DATA_DIR`.
//!
//! ## Storage Layout
//!
//! ```text
//! $DATA_DIR/
//!   ledger.redb     # wallets, transactions, API keys, user cache
//! ```
//!
//! ## Important Notes
//!
//! - Balance mutations only happen inside repository methods that also
//!   write the matching transaction rows
//! - Raw API key secrets never reach this layer; only Argon2 hashes do

pub mod database;
pub mod repository;

pub use database::{LedgerDatabase, StoreError, StoreResult};
pub use repository::{
    ApiKeyRepository, Settlement, SettlementOutcome, TransactionRepository, TransferBalances,
    UserDirectory, WalletRepository,
};
