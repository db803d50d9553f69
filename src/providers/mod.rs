// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! External payment providers.
//!
//! The ledger only needs one outbound call: open a hosted charge session for
//! a pending deposit. Confirmation arrives later through the webhook.

pub mod paystack;

use async_trait::async_trait;

use crate::models::Metadata;

pub use paystack::PaystackClient;

/// Charge session request for one pending deposit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeRequest {
    /// Ledger reference, echoed back by the provider's webhook
    pub reference: String,
    /// Amount in ledger units
    pub amount: u64,
    pub email: String,
}

/// A charge session opened by the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeSession {
    /// Hosted page where the payer completes the charge
    pub authorization_url: String,
    /// Provider payload, stored verbatim as transaction metadata
    pub payload: Metadata,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("payment provider configuration invalid: {0}")]
    Config(String),

    #[error("payment provider request invalid: {0}")]
    InvalidRequest(String),

    #[error("payment provider did not answer in time")]
    Timeout,

    #[error("payment provider request failed: {0}")]
    Request(String),

    /// Reachable, but the envelope did not report success.
    #[error("payment provider rejected the request: {0}")]
    Rejected(String),

    #[error("payment provider response was invalid: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Open a charge session. Implementations bound the call by a timeout.
    async fn initialize_charge(&self, request: &ChargeRequest)
        -> Result<ChargeSession, ProviderError>;
}
