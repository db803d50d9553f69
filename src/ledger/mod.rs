// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Wallet Ledger
//!
//! Owns wallet balances and peer-to-peer transfer semantics.
//!
//! ## Invariants
//!
//! - exactly one wallet per user, created lazily on first access
//! - balances never go negative
//! - a transfer writes both balances and both `success` entries, or nothing
//! - successful transfers conserve the sum of all balances

pub mod journal;

use std::sync::Arc;

use serde::Serialize;
use utoipa::ToSchema;

use crate::error::LedgerError;
use crate::models::{Transaction, Wallet};
use crate::storage::{StoreError, WalletRepository};

pub use journal::TransactionJournal;

/// Insert attempts before `get_or_create` gives up. Each conflict is either
/// a lost creation race (resolved by the re-read) or a wallet-number
/// collision (resolved by a fresh number).
const WALLET_CREATE_ATTEMPTS: usize = 4;

/// Outcome of a committed transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TransferResult {
    /// Reference of the sender's `transfer_out` entry
    pub reference: String,
    pub amount: u64,
    pub recipient_wallet_number: String,
    /// Sender balance after the transfer
    pub balance: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct WalletBalance {
    pub wallet_number: String,
    pub balance: u64,
}

pub struct WalletLedger {
    wallets: Arc<dyn WalletRepository>,
    journal: Arc<TransactionJournal>,
}

impl WalletLedger {
    pub fn new(wallets: Arc<dyn WalletRepository>, journal: Arc<TransactionJournal>) -> Self {
        Self { wallets, journal }
    }

    /// Fetch the user's wallet, creating it on first access.
    ///
    /// Concurrent first accesses converge on a single wallet: the loser of
    /// the insert race hits the owner uniqueness check and re-reads.
    pub fn get_or_create(&self, user_id: &str) -> Result<Wallet, LedgerError> {
        if user_id.trim().is_empty() {
            return Err(LedgerError::validation("User id must not be empty"));
        }

        for _ in 0..WALLET_CREATE_ATTEMPTS {
            if let Some(wallet) = self.wallets.find_by_user(user_id)? {
                return Ok(wallet);
            }

            let wallet = Wallet::new(user_id);
            match self.wallets.create_wallet(&wallet) {
                Ok(()) => {
                    tracing::info!(
                        user_id = %user_id,
                        wallet_id = %wallet.id,
                        wallet_number = %wallet.wallet_number,
                        "Wallet created"
                    );
                    return Ok(wallet);
                }
                Err(StoreError::Conflict(what)) => {
                    tracing::debug!(
                        user_id = %user_id,
                        conflict = %what,
                        "Wallet insert conflicted; retrying"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(LedgerError::Internal(format!(
            "could not create wallet for user {user_id}"
        )))
    }

    /// Move `amount` from the sender's wallet to the wallet numbered
    /// `recipient_wallet_number`.
    pub fn transfer(
        &self,
        sender_user_id: &str,
        recipient_wallet_number: &str,
        amount: u64,
    ) -> Result<TransferResult, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::validation("Amount must be greater than zero"));
        }
        let recipient_wallet_number = recipient_wallet_number.trim();

        let sender = self.get_or_create(sender_user_id)?;
        if sender.wallet_number == recipient_wallet_number {
            return Err(LedgerError::conflict("Cannot transfer to your own wallet"));
        }

        let recipient = self
            .wallets
            .find_by_number(recipient_wallet_number)?
            .ok_or_else(|| LedgerError::not_found("Recipient wallet not found"))?;

        // Cheap early exit; the store re-checks under the write lock.
        if sender.balance < amount {
            return Err(LedgerError::InsufficientFunds);
        }

        let (debit, credit) = Transaction::transfer_pair(&sender.id, &recipient.id, amount);
        let balances = self.wallets.commit_transfer(&debit, &credit)?;

        tracing::info!(
            sender_wallet_id = %sender.id,
            recipient_wallet_id = %recipient.id,
            amount,
            reference = %debit.reference,
            "Transfer committed"
        );

        Ok(TransferResult {
            reference: debit.reference,
            amount,
            recipient_wallet_number: recipient.wallet_number,
            balance: balances.sender.balance,
        })
    }

    pub fn balance(&self, user_id: &str) -> Result<WalletBalance, LedgerError> {
        let wallet = self.get_or_create(user_id)?;
        Ok(WalletBalance {
            wallet_number: wallet.wallet_number,
            balance: wallet.balance,
        })
    }

    /// The user's entries, newest first.
    pub fn history(&self, user_id: &str) -> Result<Vec<Transaction>, LedgerError> {
        let wallet = self.get_or_create(user_id)?;
        self.journal.history(&wallet.id)
    }
}

#[cfg(test)]
pub(crate) fn test_ledger(db: Arc<crate::storage::LedgerDatabase>) -> WalletLedger {
    let journal = Arc::new(TransactionJournal::new(db.clone()));
    WalletLedger::new(db, journal)
}
