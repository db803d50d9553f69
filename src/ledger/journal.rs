// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Read model over ledger entries. Never mutates.

use std::sync::Arc;

use crate::error::LedgerError;
use crate::models::Transaction;
use crate::storage::TransactionRepository;

pub struct TransactionJournal {
    transactions: Arc<dyn TransactionRepository>,
}

impl TransactionJournal {
    pub fn new(transactions: Arc<dyn TransactionRepository>) -> Self {
        Self { transactions }
    }

    /// A wallet's entries, newest first.
    pub fn history(&self, wallet_id: &str) -> Result<Vec<Transaction>, LedgerError> {
        Ok(self.transactions.list_by_wallet(wallet_id)?)
    }

    /// Entry with `reference`, but only if it belongs to `wallet_id`.
    ///
    /// Entries of other wallets read as absent.
    pub fn find_in_wallet(
        &self,
        wallet_id: &str,
        reference: &str,
    ) -> Result<Option<Transaction>, LedgerError> {
        Ok(self
            .transactions
            .find_by_reference(reference)?
            .filter(|tx| tx.wallet_id == wallet_id))
    }
}
