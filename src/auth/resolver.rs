// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Maps presented credentials to a [`Principal`].
//!
//! Precedence: a session token wins over an API key when both are present.

use std::sync::Arc;

use chrono::Utc;

use super::{AuthError, Principal, SessionVerifier};
use crate::credentials::{secret, CredentialAuthority};
use crate::error::LedgerError;
use crate::models::UserProfile;
use crate::storage::UserDirectory;

pub struct PrincipalResolver {
    sessions: Arc<dyn SessionVerifier>,
    credentials: Arc<CredentialAuthority>,
    users: Arc<dyn UserDirectory>,
}

impl PrincipalResolver {
    pub fn new(
        sessions: Arc<dyn SessionVerifier>,
        credentials: Arc<CredentialAuthority>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            sessions,
            credentials,
            users,
        }
    }

    pub async fn resolve(
        &self,
        session_token: Option<&str>,
        api_key: Option<&str>,
    ) -> Result<Principal, LedgerError> {
        if let Some(token) = session_token {
            return self.resolve_session(token).await;
        }
        if let Some(api_key) = api_key {
            return self.resolve_api_key(api_key).await;
        }
        Err(AuthError::MissingCredentials.into())
    }

    async fn resolve_session(&self, token: &str) -> Result<Principal, LedgerError> {
        let identity = self.sessions.verify(token).inspect_err(|e| {
            tracing::debug!(reason = e.error_code(), "Session token rejected");
        })?;

        if let Some(email) = identity.email {
            let users = Arc::clone(&self.users);
            let user_id = identity.user_id.clone();
            tokio::task::spawn_blocking(move || remember_email(users.as_ref(), &user_id, email))
                .await
                .map_err(|e| LedgerError::Internal(format!("email cache task failed: {e}")))??;
        }
        Ok(Principal::user(identity.user_id))
    }

    async fn resolve_api_key(&self, api_key: &str) -> Result<Principal, LedgerError> {
        let parsed = secret::parse_token(api_key).ok_or(AuthError::MalformedApiKey)?;
        let public_id = parsed.public_id.to_string();
        let raw_secret = parsed.secret.to_string();

        let credentials = Arc::clone(&self.credentials);
        let verified = tokio::task::spawn_blocking(move || credentials.verify(&public_id, &raw_secret))
            .await
            .map_err(|e| LedgerError::Internal(format!("key verification task failed: {e}")))??;

        let Some(key) = verified else {
            tracing::debug!(public_id = %parsed.public_id, "Unknown API key or wrong secret");
            return Err(AuthError::InvalidApiKey.into());
        };
        if key.revoked {
            tracing::debug!(public_id = %key.public_id, "Revoked API key presented");
            return Err(AuthError::ApiKeyRevoked.into());
        }
        if key.is_expired_at(Utc::now()) {
            tracing::debug!(public_id = %key.public_id, "Expired API key presented");
            return Err(AuthError::ApiKeyExpired.into());
        }

        Ok(Principal::service(key.owner_user_id, key.permissions))
    }
}

/// Cache the session email so API-key callers can deposit too.
fn remember_email(
    users: &dyn UserDirectory,
    user_id: &str,
    email: String,
) -> Result<(), LedgerError> {
    let known = users.find_user(user_id)?;
    if known.as_ref().is_some_and(|profile| profile.email == email) {
        return Ok(());
    }
    users.upsert_user(&UserProfile {
        user_id: user_id.to_string(),
        email,
        active: true,
    })?;
    Ok(())
}
