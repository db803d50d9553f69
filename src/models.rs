// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger domain types: wallets, transactions and API keys.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Opaque provider payload, stored verbatim and never interpreted.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Kind of balance-affecting event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Deposit,
    TransferIn,
    TransferOut,
}

/// Transaction lifecycle status.
///
/// `Success` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
}

impl TransactionStatus {
    pub fn is_terminal(self) -> bool {
        match self {
            TransactionStatus::Pending => false,
            TransactionStatus::Success | TransactionStatus::Failed => true,
        }
    }
}

/// Scope granted to an API key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Deposit,
    Transfer,
    Read,
}

impl Permission {
    pub const ALL: [Permission; 3] = [Permission::Deposit, Permission::Transfer, Permission::Read];

    pub fn as_str(self) -> &'static str {
        match self {
            Permission::Deposit => "deposit",
            Permission::Transfer => "transfer",
            Permission::Read => "read",
        }
    }
}

impl FromStr for Permission {
    type Err = String;

    /// Exact, lowercase match against the fixed vocabulary.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(Permission::Deposit),
            "transfer" => Ok(Permission::Transfer),
            "read" => Ok(Permission::Read),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One wallet per user, created lazily.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    /// Internal identifier (UUID)
    pub id: String,
    /// Owning user
    pub user_id: String,
    /// Caller-facing transfer destination handle; immutable
    pub wallet_number: String,
    /// Balance in the smallest currency unit
    pub balance: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    /// Build an empty wallet with a fresh id and wallet number.
    pub fn new(user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            wallet_number: Uuid::new_v4().simple().to_string(),
            balance: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Immutable record of one balance-affecting event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub wallet_id: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub status: TransactionStatus,
    pub amount: u64,
    /// Unique idempotency reference
    pub reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counterparty_wallet_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    fn new(
        wallet_id: &str,
        kind: TransactionType,
        status: TransactionStatus,
        amount: u64,
        reference: String,
        counterparty_wallet_id: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            wallet_id: wallet_id.to_string(),
            kind,
            status,
            amount,
            reference,
            counterparty_wallet_id,
            metadata: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// A deposit awaiting provider confirmation.
    pub fn pending_deposit(wallet_id: &str, amount: u64, reference: String) -> Self {
        Self::new(
            wallet_id,
            TransactionType::Deposit,
            TransactionStatus::Pending,
            amount,
            reference,
            None,
        )
    }

    /// The two linked, already-settled legs of a transfer: `(out, in)`.
    pub fn transfer_pair(sender_wallet_id: &str, recipient_wallet_id: &str, amount: u64) -> (Self, Self) {
        let debit = Self::new(
            sender_wallet_id,
            TransactionType::TransferOut,
            TransactionStatus::Success,
            amount,
            new_reference("tr_out"),
            Some(recipient_wallet_id.to_string()),
        );
        let credit = Self::new(
            recipient_wallet_id,
            TransactionType::TransferIn,
            TransactionStatus::Success,
            amount,
            new_reference("tr_in"),
            Some(sender_wallet_id.to_string()),
        );
        (debit, credit)
    }
}

/// Fresh unique reference of the form `<prefix>_<32 hex>`.
pub fn new_reference(prefix: &str) -> String {
    format!("{prefix}_{}", Uuid::new_v4().simple())
}

/// Long-lived machine credential.
///
/// Only the Argon2 hash of the secret is ever stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiKey {
    /// Primary key: PHC-encoded Argon2id hash of the secret
    pub key_hash: String,
    /// Correlation id embedded in the presented key
    pub public_id: String,
    /// Display-safe rendering, e.g. `sk_live_3fa9c_***x7Q`
    pub masked_key: String,
    pub owner_user_id: String,
    pub name: String,
    pub permissions: Vec<Permission>,
    pub revoked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApiKey {
    /// Expiry set and not in the future.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(expires_at) if expires_at <= now)
    }

    /// Not revoked and not expired.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && !self.is_expired_at(now)
    }
}

/// Identity attributes the ledger needs from the identity subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub email: String,
    pub active: bool,
}
