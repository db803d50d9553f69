// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to the ledger database.
//!
//! Each repository is a trait implemented by `LedgerDatabase`, so services
//! hold `Arc<dyn ...>` handles and tests can substitute their own stores.

pub mod api_keys;
pub mod transactions;
pub mod users;
pub mod wallets;

pub use api_keys::ApiKeyRepository;
pub use transactions::{Settlement, SettlementOutcome, TransactionRepository};
pub use users::UserDirectory;
pub use wallets::{TransferBalances, WalletRepository};
