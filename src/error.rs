// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Error taxonomy shared by every ledger operation, and its HTTP rendering.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::auth::AuthError;
use crate::models::Permission;
use crate::providers::ProviderError;
use crate::storage::StoreError;

/// Caller-facing failure of a ledger operation.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Malformed amount, permission set, duration or payload.
    #[error("{0}")]
    Validation(String),

    /// Missing, invalid, expired or revoked credential.
    #[error(transparent)]
    Authentication(#[from] AuthError),

    /// Valid credential without the required permission.
    #[error("{0}")]
    Authorization(String),

    /// Wallet, transaction or key absent, or not owned by the caller.
    #[error("{0}")]
    NotFound(String),

    /// Active-key limit, rollover of a live key, self-transfer.
    #[error("{0}")]
    Conflict(String),

    #[error("Insufficient balance")]
    InsufficientFunds,

    /// Payment provider unreachable or returned a non-success envelope.
    #[error("Payment provider error: {0}")]
    Upstream(#[from] ProviderError),

    /// Storage fault; never caused by the caller.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn missing_permission(permission: Permission) -> Self {
        Self::Authorization(format!("Missing permission: {permission}"))
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Authorization(message.into())
    }

    /// Stable machine-readable code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            LedgerError::Validation(_) => "validation_error",
            LedgerError::Authentication(auth) => auth.error_code(),
            LedgerError::Authorization(_) => "insufficient_permissions",
            LedgerError::NotFound(_) => "not_found",
            LedgerError::Conflict(_) => "conflict",
            LedgerError::InsufficientFunds => "insufficient_funds",
            LedgerError::Upstream(_) => "upstream_error",
            LedgerError::Internal(_) => "internal_error",
        }
    }

    /// Message safe to show the caller; provider and storage detail stays in logs.
    pub fn client_message(&self) -> String {
        match self {
            LedgerError::Upstream(_) => "Payment provider error".to_string(),
            LedgerError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            LedgerError::Validation(_) | LedgerError::InsufficientFunds => StatusCode::BAD_REQUEST,
            LedgerError::Authentication(_) => StatusCode::UNAUTHORIZED,
            LedgerError::Authorization(_) => StatusCode::FORBIDDEN,
            LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
            LedgerError::Conflict(_) => StatusCode::CONFLICT,
            LedgerError::Upstream(_) => StatusCode::BAD_GATEWAY,
            LedgerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for LedgerError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound(what) => LedgerError::NotFound(format!("{what} not found")),
            StoreError::Conflict(what) => LedgerError::Conflict(format!("{what} already exists")),
            StoreError::InsufficientFunds { .. } => LedgerError::InsufficientFunds,
            StoreError::CapacityExceeded { limit } => {
                LedgerError::Conflict(format!("Limit of {limit} active keys reached"))
            }
            other => LedgerError::Internal(other.to_string()),
        }
    }
}

/// HTTP error envelope.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    error_code: &'static str,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }
}

impl From<LedgerError> for ApiError {
    fn from(error: LedgerError) -> Self {
        let status = error.status_code();
        if status.is_server_error() {
            tracing::error!(error = %error, "Ledger operation failed");
        }
        Self::new(status, error.error_code(), error.client_message())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
            error_code: self.code,
        });
        (self.status, body).into_response()
    }
}

impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn taxonomy_maps_to_http_status() {
        assert_eq!(
            LedgerError::validation("bad").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            LedgerError::from(AuthError::ApiKeyRevoked).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            LedgerError::missing_permission(Permission::Transfer).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            LedgerError::conflict("self").status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            LedgerError::Upstream(ProviderError::Timeout).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn store_errors_keep_their_meaning() {
        let err: LedgerError = StoreError::CapacityExceeded { limit: 20 }.into();
        assert!(matches!(err, LedgerError::Conflict(ref msg) if msg.contains("20")));

        let err: LedgerError = StoreError::InsufficientFunds {
            available: 1,
            requested: 2,
        }
        .into();
        assert!(matches!(err, LedgerError::InsufficientFunds));

        let err: LedgerError = StoreError::NotFound("Wallet w-1".to_string()).into();
        assert!(matches!(err, LedgerError::NotFound(_)));
    }

    #[tokio::test]
    async fn into_response_returns_json_body() {
        let response = LedgerError::missing_permission(Permission::Read).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["error"], "Missing permission: read");
        assert_eq!(body["error_code"], "insufficient_permissions");
    }

    #[tokio::test]
    async fn provider_detail_is_not_rendered() {
        let error = LedgerError::from(ProviderError::Rejected("HTTP 401: Invalid key".to_string()));
        assert!(error.to_string().contains("Invalid key"));

        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["error"], "Payment provider error");
        assert_eq!(body["error_code"], "upstream_error");
    }
}
