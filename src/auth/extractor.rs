// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for authenticated callers.
//!
//! Use the `Authenticated` extractor in handlers to require a principal:
//!
//! ```rust,ignore
//! async fn my_handler(Authenticated(principal): Authenticated) -> impl IntoResponse {
//!     principal.require_permission(Permission::Read)?;
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{
        header::{AsHeaderName, AUTHORIZATION},
        request::Parts,
        HeaderMap,
    },
};

use super::{AuthError, Principal};
use crate::error::LedgerError;
use crate::state::AppState;

/// Header carrying an API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Caller resolved from `Authorization: Bearer` or `x-api-key`.
pub struct Authenticated(pub Principal);

fn header_str<'a>(
    headers: &'a HeaderMap,
    name: impl AsHeaderName,
) -> Result<Option<&'a str>, AuthError> {
    match headers.get(name) {
        None => Ok(None),
        Some(value) => value
            .to_str()
            .map(|s| Some(s.trim()))
            .map_err(|_| AuthError::InvalidAuthHeader),
    }
}

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = LedgerError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // Extract Bearer token
        let bearer = match header_str(&parts.headers, AUTHORIZATION)? {
            Some(value) => Some(
                value
                    .strip_prefix("Bearer ")
                    .map(str::trim)
                    .filter(|token| !token.is_empty())
                    .ok_or(AuthError::InvalidAuthHeader)?,
            ),
            None => None,
        };
        let api_key = header_str(&parts.headers, API_KEY_HEADER)
            .map_err(|_| AuthError::MalformedApiKey)?
            .filter(|key| !key.is_empty());

        let principal = state.resolver.resolve(bearer, api_key).await?;
        Ok(Authenticated(principal))
    }
}
