// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Deposit Reconciler
//!
//! Drives a deposit through `pending → success | failed`.
//!
//! ## Flow
//!
//! 1. `initiate` records a `pending` deposit, then asks the provider for a
//!    hosted charge page. A provider failure marks the deposit `failed`.
//! 2. The payer completes the charge on the provider's page.
//! 3. The provider calls the webhook; `reconcile` authenticates it and
//!    applies the verdict through `TransactionRepository::settle_deposit`,
//!    which credits at most once per reference.

pub mod webhook;

use std::sync::Arc;

use serde::Serialize;
use utoipa::ToSchema;

use crate::error::LedgerError;
use crate::ledger::{TransactionJournal, WalletLedger};
use crate::models::{new_reference, Transaction, TransactionStatus, TransactionType};
use crate::providers::{paystack::map_charge_status, ChargeRequest, PaymentProvider};
use crate::storage::{Settlement, StoreError, TransactionRepository, UserDirectory};

pub use webhook::{WebhookVerifier, SIGNATURE_HEADER};

/// Prefix of deposit references.
pub const DEPOSIT_REFERENCE_PREFIX: &str = "dep";

/// A charge session the caller should redirect the payer to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct DepositSession {
    pub reference: String,
    pub authorization_url: String,
}

/// Client-facing snapshot of one deposit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct DepositStatus {
    pub reference: String,
    pub status: TransactionStatus,
    pub amount: u64,
}

pub struct DepositReconciler {
    ledger: Arc<WalletLedger>,
    journal: Arc<TransactionJournal>,
    transactions: Arc<dyn TransactionRepository>,
    users: Arc<dyn UserDirectory>,
    provider: Arc<dyn PaymentProvider>,
    verifier: WebhookVerifier,
}

impl DepositReconciler {
    pub fn new(
        ledger: Arc<WalletLedger>,
        journal: Arc<TransactionJournal>,
        transactions: Arc<dyn TransactionRepository>,
        users: Arc<dyn UserDirectory>,
        provider: Arc<dyn PaymentProvider>,
        verifier: WebhookVerifier,
    ) -> Self {
        Self {
            ledger,
            journal,
            transactions,
            users,
            provider,
            verifier,
        }
    }

    /// Record a pending deposit and open a provider charge session for it.
    pub async fn initiate(
        &self,
        user_id: &str,
        amount: u64,
    ) -> Result<DepositSession, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::validation("Amount must be greater than zero"));
        }
        let wallet = self.ledger.get_or_create(user_id)?;
        let email = self.users.email_for(user_id)?.ok_or_else(|| {
            LedgerError::validation("No email on file; sign in with a session token once first")
        })?;

        let reference = new_reference(DEPOSIT_REFERENCE_PREFIX);
        let pending = Transaction::pending_deposit(&wallet.id, amount, reference.clone());
        self.transactions.insert_transaction(&pending)?;
        tracing::info!(
            wallet_id = %wallet.id,
            reference = %reference,
            amount,
            "Deposit initiated"
        );

        // Dropped before disarming (provider error, or the caller went away
        // mid-request) means the deposit ends `failed`.
        let mut guard = PendingDeposit::new(Arc::clone(&self.transactions), reference.clone());

        let request = ChargeRequest {
            reference: reference.clone(),
            amount,
            email,
        };
        let session = match self.provider.initialize_charge(&request).await {
            Ok(session) => session,
            Err(provider_error) => {
                tracing::warn!(
                    reference = %reference,
                    error = %provider_error,
                    "Payment provider failed; marking deposit failed"
                );
                return Err(provider_error.into());
            }
        };
        guard.disarm();

        match self.transactions.attach_metadata(&reference, session.payload) {
            Ok(_) => {}
            // A fast webhook may already have settled it.
            Err(StoreError::InvalidState(_)) => {
                tracing::debug!(
                    reference = %reference,
                    "Deposit settled before metadata was stored"
                );
            }
            Err(e) => return Err(e.into()),
        }

        Ok(DepositSession {
            reference,
            authorization_url: session.authorization_url,
        })
    }

    /// Authenticate a webhook delivery and apply it.
    ///
    /// Bad or missing signatures are rejected before anything is read from
    /// storage. Unknown references are acknowledged without effect.
    pub fn reconcile(
        &self,
        raw_body: &[u8],
        signature: Option<&str>,
    ) -> Result<Settlement, LedgerError> {
        let signature =
            signature.ok_or_else(|| LedgerError::validation("Missing webhook signature"))?;
        if !self.verifier.verify(raw_body, signature) {
            tracing::warn!("Webhook rejected: invalid signature");
            return Err(LedgerError::validation("Invalid webhook signature"));
        }

        let event = webhook::parse_event(raw_body)
            .ok_or_else(|| LedgerError::validation("Webhook body must be a JSON object"))?;
        let Some(reference) = event.reference else {
            tracing::debug!(event = ?event.event, "Webhook without reference ignored");
            return Ok(Settlement::UnknownReference);
        };

        let outcome = map_charge_status(event.status.as_deref().unwrap_or_default());
        let settlement = self
            .transactions
            .settle_deposit(&reference, outcome, event.payload)?;

        match &settlement {
            Settlement::UnknownReference => {
                tracing::info!(reference = %reference, "Webhook for unknown reference ignored")
            }
            Settlement::AlreadySettled(tx) => tracing::info!(
                reference = %reference,
                status = ?tx.status,
                "Webhook for settled deposit ignored"
            ),
            Settlement::Credited { transaction, balance } => tracing::info!(
                reference = %reference,
                wallet_id = %transaction.wallet_id,
                amount = transaction.amount,
                balance,
                "Deposit credited"
            ),
            Settlement::Failed(tx) => {
                tracing::info!(reference = %reference, wallet_id = %tx.wallet_id, "Deposit failed")
            }
            Settlement::StillPending(_) => {
                tracing::info!(reference = %reference, "Deposit still pending")
            }
        }
        Ok(settlement)
    }

    /// Status of one of the caller's own deposits.
    pub fn status(&self, user_id: &str, reference: &str) -> Result<DepositStatus, LedgerError> {
        let wallet = self.ledger.get_or_create(user_id)?;
        let deposit = self
            .journal
            .find_in_wallet(&wallet.id, reference.trim())?
            .filter(|tx| tx.kind == TransactionType::Deposit)
            .ok_or_else(|| LedgerError::not_found("Transaction not found"))?;

        Ok(DepositStatus {
            reference: deposit.reference,
            status: deposit.status,
            amount: deposit.amount,
        })
    }
}

/// Marks a pending deposit failed when dropped while still armed.
struct PendingDeposit {
    transactions: Arc<dyn TransactionRepository>,
    reference: String,
    armed: bool,
}

impl PendingDeposit {
    fn new(transactions: Arc<dyn TransactionRepository>, reference: String) -> Self {
        Self {
            transactions,
            reference,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PendingDeposit {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match self.transactions.mark_failed(&self.reference) {
            Ok(_) => tracing::info!(
                reference = %self.reference,
                "Deposit not confirmed by provider; marked failed"
            ),
            // Already settled by a webhook.
            Err(StoreError::InvalidState(_)) => {}
            Err(e) => tracing::error!(
                reference = %self.reference,
                error = %e,
                "Could not mark deposit failed"
            ),
        }
    }
}
