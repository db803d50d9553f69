// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet endpoints: deposits, transfers, balance and history.
//!
//! Session callers may do everything; API key callers need the permission
//! named on each route.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{run_blocking, JsonBody};
use crate::{
    auth::Authenticated,
    deposits::{DepositSession, DepositStatus, SIGNATURE_HEADER},
    error::{ApiError, LedgerError},
    ledger::{TransferResult, WalletBalance},
    models::{Permission, Transaction, TransactionStatus, TransactionType},
    state::AppState,
};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct DepositRequest {
    /// Amount in the smallest currency unit.
    pub amount: i64,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TransferRequest {
    /// Destination wallet number.
    pub wallet_number: String,
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TransferResponse {
    pub status: String,
    pub message: String,
    pub transfer: TransferResult,
}

/// One line of the transaction history.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TransactionItem {
    pub reference: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub status: TransactionStatus,
    pub amount: u64,
    pub created_at: DateTime<Utc>,
}

impl From<Transaction> for TransactionItem {
    fn from(tx: Transaction) -> Self {
        Self {
            reference: tx.reference,
            kind: tx.kind,
            status: tx.status,
            amount: tx.amount,
            created_at: tx.created_at,
        }
    }
}

/// Acknowledgement returned to the payment provider.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WebhookAck {
    pub status: bool,
}

fn positive_amount(amount: i64) -> Result<u64, LedgerError> {
    u64::try_from(amount)
        .ok()
        .filter(|amount| *amount > 0)
        .ok_or_else(|| LedgerError::validation("Amount must be greater than zero"))
}

#[utoipa::path(
    post,
    path = "/wallet/deposit",
    tag = "Wallet",
    security(("bearer_auth" = []), ("api_key" = [])),
    request_body = DepositRequest,
    responses(
        (status = 200, description = "Charge session opened", body = DepositSession),
        (status = 400, description = "Invalid amount or no email on file"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Missing deposit permission"),
        (status = 502, description = "Payment provider error")
    )
)]
pub async fn create_deposit(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    JsonBody(request): JsonBody<DepositRequest>,
) -> Result<Json<DepositSession>, ApiError> {
    principal.require_permission(Permission::Deposit)?;
    let amount = positive_amount(request.amount)?;

    let session = state.deposits.initiate(&principal.user_id, amount).await?;
    Ok(Json(session))
}

#[utoipa::path(
    get,
    path = "/wallet/deposit/{reference}/status",
    tag = "Wallet",
    security(("bearer_auth" = []), ("api_key" = [])),
    params(
        ("reference" = String, Path, description = "Deposit reference")
    ),
    responses(
        (status = 200, description = "Deposit status", body = DepositStatus),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Missing read permission"),
        (status = 404, description = "No such deposit in the caller's wallet")
    )
)]
pub async fn deposit_status(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Path(reference): Path<String>,
) -> Result<Json<DepositStatus>, ApiError> {
    principal.require_permission(Permission::Read)?;

    let deposits = Arc::clone(&state.deposits);
    let status = run_blocking(move || deposits.status(&principal.user_id, &reference)).await?;
    Ok(Json(status))
}

#[utoipa::path(
    post,
    path = "/wallet/transfer",
    tag = "Wallet",
    security(("bearer_auth" = []), ("api_key" = [])),
    request_body = TransferRequest,
    responses(
        (status = 200, description = "Transfer completed", body = TransferResponse),
        (status = 400, description = "Invalid amount or insufficient balance"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Missing transfer permission"),
        (status = 404, description = "Recipient wallet not found"),
        (status = 409, description = "Transfer to own wallet")
    )
)]
pub async fn transfer(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    JsonBody(request): JsonBody<TransferRequest>,
) -> Result<Json<TransferResponse>, ApiError> {
    principal.require_permission(Permission::Transfer)?;
    let amount = positive_amount(request.amount)?;

    let ledger = Arc::clone(&state.ledger);
    let result = run_blocking(move || {
        ledger.transfer(&principal.user_id, &request.wallet_number, amount)
    })
    .await?;

    Ok(Json(TransferResponse {
        status: "success".to_string(),
        message: "Transfer completed".to_string(),
        transfer: result,
    }))
}

#[utoipa::path(
    get,
    path = "/wallet/balance",
    tag = "Wallet",
    security(("bearer_auth" = []), ("api_key" = [])),
    responses(
        (status = 200, description = "Current balance", body = WalletBalance),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Missing read permission")
    )
)]
pub async fn balance(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
) -> Result<Json<WalletBalance>, ApiError> {
    principal.require_permission(Permission::Read)?;

    let ledger = Arc::clone(&state.ledger);
    let balance = run_blocking(move || ledger.balance(&principal.user_id)).await?;
    Ok(Json(balance))
}

/// The caller's transactions, newest first.
#[utoipa::path(
    get,
    path = "/wallet/transactions",
    tag = "Wallet",
    security(("bearer_auth" = []), ("api_key" = [])),
    responses(
        (status = 200, description = "Transaction history", body = [TransactionItem]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Missing read permission")
    )
)]
pub async fn transactions(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
) -> Result<Json<Vec<TransactionItem>>, ApiError> {
    principal.require_permission(Permission::Read)?;

    let ledger = Arc::clone(&state.ledger);
    let history = run_blocking(move || ledger.history(&principal.user_id)).await?;
    Ok(Json(history.into_iter().map(TransactionItem::from).collect()))
}

/// Payment provider callback.
///
/// Authenticated by the HMAC signature header, not by a principal. Every
/// authentic delivery is acknowledged, including unknown references.
#[utoipa::path(
    post,
    path = "/wallet/paystack/webhook",
    tag = "Wallet",
    params(
        ("x-paystack-signature" = String, Header, description = "Hex HMAC-SHA512 of the raw body")
    ),
    request_body(content = String, description = "Raw provider event", content_type = "application/json"),
    responses(
        (status = 200, description = "Delivery acknowledged", body = WebhookAck),
        (status = 400, description = "Missing or invalid signature")
    )
)]
pub async fn paystack_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let deposits = Arc::clone(&state.deposits);
    run_blocking(move || deposits.reconcile(&body, signature.as_deref())).await?;
    Ok(Json(WebhookAck { status: true }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_must_be_positive() {
        assert_eq!(positive_amount(500).unwrap(), 500);
        for amount in [0, -1, i64::MIN] {
            assert!(matches!(
                positive_amount(amount),
                Err(LedgerError::Validation(_))
            ));
        }
    }

    #[test]
    fn history_item_uses_wire_names() {
        let tx = Transaction::pending_deposit("w-1", 250, "dep_abc".to_string());
        let item = serde_json::to_value(TransactionItem::from(tx)).unwrap();
        assert_eq!(item["type"], "deposit");
        assert_eq!(item["status"], "pending");
        assert_eq!(item["amount"], 250);
        assert_eq!(item["reference"], "dep_abc");
        assert!(item.get("wallet_id").is_none());
    }
}
