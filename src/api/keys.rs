// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! API key management endpoints.
//!
//! Every route here requires a session token. API keys cannot mint, list,
//! revoke or roll over other keys.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{run_blocking, JsonBody};
use crate::{
    auth::Authenticated,
    credentials::IssuedKey,
    error::ApiError,
    models::{ApiKey, Permission},
    state::AppState,
};

/// Request to issue a new API key.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateKeyRequest {
    /// Human-readable label.
    pub name: String,
    /// One to three of `deposit`, `transfer`, `read`.
    pub permissions: Vec<String>,
    /// Lifetime as `<n><H|D|M|Y>`, e.g. `30D`.
    #[serde(alias = "expires_at")]
    pub expiry: String,
}

/// A freshly minted key. The secret is shown here and never again.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CreateKeyResponse {
    pub api_key: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<IssuedKey> for CreateKeyResponse {
    fn from(issued: IssuedKey) -> Self {
        Self {
            expires_at: issued.key.expires_at,
            api_key: issued.token,
        }
    }
}

/// Display-safe view of a stored key.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApiKeyView {
    pub public_id: String,
    /// Masked form, e.g. `sk_live_3fa9c_***x7Q`.
    pub api_key: String,
    pub name: String,
    pub permissions: Vec<Permission>,
    pub revoked: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<ApiKey> for ApiKeyView {
    fn from(key: ApiKey) -> Self {
        Self {
            public_id: key.public_id,
            api_key: key.masked_key,
            name: key.name,
            permissions: key.permissions,
            revoked: key.revoked,
            expires_at: key.expires_at,
            created_at: key.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RevokeKeyRequest {
    /// Full key as returned on creation.
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RevokeKeyResponse {
    pub message: String,
    pub key: ApiKeyView,
}

/// Request to replace an expired key.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RolloverKeyRequest {
    /// Full expired key as returned on creation.
    pub expired_key_id: String,
    /// Lifetime of the replacement.
    pub expiry: String,
    /// Defaults to the expired key's permissions.
    #[serde(default)]
    pub permissions: Option<Vec<String>>,
}

#[utoipa::path(
    post,
    path = "/keys/create",
    tag = "Keys",
    security(("bearer_auth" = [])),
    request_body = CreateKeyRequest,
    responses(
        (status = 201, description = "Key issued", body = CreateKeyResponse),
        (status = 400, description = "Invalid name, permissions or expiry"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "API keys cannot manage keys"),
        (status = 409, description = "Active key limit reached")
    )
)]
pub async fn create_key(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    JsonBody(request): JsonBody<CreateKeyRequest>,
) -> Result<(StatusCode, Json<CreateKeyResponse>), ApiError> {
    principal.require_user()?;

    let credentials = Arc::clone(&state.credentials);
    let issued = run_blocking(move || {
        credentials.issue(
            &principal.user_id,
            &request.name,
            &request.permissions,
            &request.expiry,
        )
    })
    .await?;

    Ok((StatusCode::CREATED, Json(issued.into())))
}

/// Every key of the caller, newest first.
#[utoipa::path(
    get,
    path = "/keys",
    tag = "Keys",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All keys", body = [ApiKeyView]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "API keys cannot manage keys")
    )
)]
pub async fn list_keys(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
) -> Result<Json<Vec<ApiKeyView>>, ApiError> {
    principal.require_user()?;
    let credentials = Arc::clone(&state.credentials);
    let keys = run_blocking(move || credentials.list(&principal.user_id)).await?;
    Ok(Json(keys.into_iter().map(ApiKeyView::from).collect()))
}

/// Keys that are neither revoked nor expired.
#[utoipa::path(
    get,
    path = "/keys/active",
    tag = "Keys",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Active keys", body = [ApiKeyView]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "API keys cannot manage keys")
    )
)]
pub async fn list_active_keys(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
) -> Result<Json<Vec<ApiKeyView>>, ApiError> {
    principal.require_user()?;
    let credentials = Arc::clone(&state.credentials);
    let keys =
        run_blocking(move || credentials.list_active_at(&principal.user_id, Utc::now())).await?;
    Ok(Json(keys.into_iter().map(ApiKeyView::from).collect()))
}

#[utoipa::path(
    post,
    path = "/keys/revoke",
    tag = "Keys",
    security(("bearer_auth" = [])),
    request_body = RevokeKeyRequest,
    responses(
        (status = 200, description = "Key revoked", body = RevokeKeyResponse),
        (status = 400, description = "Malformed key"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Key not found")
    )
)]
pub async fn revoke_key(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    JsonBody(request): JsonBody<RevokeKeyRequest>,
) -> Result<Json<RevokeKeyResponse>, ApiError> {
    principal.require_user()?;

    let credentials = Arc::clone(&state.credentials);
    let revoked =
        run_blocking(move || credentials.revoke_owned(&principal.user_id, &request.api_key))
            .await?;

    Ok(Json(RevokeKeyResponse {
        message: format!("{} successfully revoked", revoked.masked_key),
        key: revoked.into(),
    }))
}

/// Issue a replacement for an expired key. The old key stays as it is.
#[utoipa::path(
    post,
    path = "/keys/rollover",
    tag = "Keys",
    security(("bearer_auth" = [])),
    request_body = RolloverKeyRequest,
    responses(
        (status = 200, description = "Replacement issued", body = CreateKeyResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Key not found"),
        (status = 409, description = "Key has not expired or limit reached")
    )
)]
pub async fn rollover_key(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    JsonBody(request): JsonBody<RolloverKeyRequest>,
) -> Result<Json<CreateKeyResponse>, ApiError> {
    principal.require_user()?;

    let credentials = Arc::clone(&state.credentials);
    let issued = run_blocking(move || {
        credentials.rollover(
            &principal.user_id,
            &request.expired_key_id,
            &request.expiry,
            request.permissions.as_deref(),
        )
    })
    .await?;

    Ok(Json(issued.into()))
}
