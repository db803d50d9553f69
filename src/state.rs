// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::{JwtSessionVerifier, PrincipalResolver};
use crate::config::LedgerConfig;
use crate::credentials::CredentialAuthority;
use crate::deposits::{DepositReconciler, WebhookVerifier};
use crate::ledger::{TransactionJournal, WalletLedger};
use crate::providers::{PaymentProvider, PaystackClient, ProviderError};
use crate::storage::LedgerDatabase;

/// Shared handles for request handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<LedgerDatabase>,
    pub ledger: Arc<WalletLedger>,
    pub deposits: Arc<DepositReconciler>,
    pub credentials: Arc<CredentialAuthority>,
    pub resolver: Arc<PrincipalResolver>,
}

impl AppState {
    /// Wire every component over one database and payment provider.
    pub fn new(
        db: Arc<LedgerDatabase>,
        provider: Arc<dyn PaymentProvider>,
        config: &LedgerConfig,
    ) -> Self {
        let journal = Arc::new(TransactionJournal::new(db.clone()));
        let ledger = Arc::new(WalletLedger::new(db.clone(), Arc::clone(&journal)));
        let credentials = Arc::new(CredentialAuthority::new(
            db.clone(),
            config.hashing,
            config.api_key_env_tag.clone(),
        ));
        let resolver = Arc::new(PrincipalResolver::new(
            Arc::new(JwtSessionVerifier::new(config.session_token_secret.as_bytes())),
            Arc::clone(&credentials),
            db.clone(),
        ));
        let deposits = Arc::new(DepositReconciler::new(
            Arc::clone(&ledger),
            journal,
            db.clone(),
            db.clone(),
            provider,
            WebhookVerifier::new(config.paystack_secret_key.as_bytes()),
        ));

        Self {
            db,
            ledger,
            deposits,
            credentials,
            resolver,
        }
    }

    /// Production wiring: Paystack as the payment provider.
    pub fn with_paystack(
        db: Arc<LedgerDatabase>,
        config: &LedgerConfig,
    ) -> Result<Self, ProviderError> {
        let provider = PaystackClient::new(
            &config.paystack_base_url,
            &config.paystack_secret_key,
            config.provider_timeout,
        )?;
        Ok(Self::new(db, Arc::new(provider), config))
    }
}
