// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Credential Authority
//!
//! Issues, verifies, revokes and rolls over long-lived API keys.
//!
//! ## Key Lifecycle
//!
//! 1. `issue` generates a 256-bit secret, stores only its Argon2id hash and
//!    returns the full token exactly once
//! 2. `verify` resolves a public id and checks the secret against the hash
//! 3. `revoke` flips the revoked flag; nothing else ever changes a key
//! 4. `rollover` mints a new key to replace an expired one, leaving the old
//!    record in place for audit
//!
//! Hashing is CPU-bound. Every method here is synchronous and async callers
//! run them on the blocking pool.

pub mod hashing;
pub mod secret;

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::LedgerError;
use crate::models::{ApiKey, Permission};
use crate::storage::ApiKeyRepository;
use crate::ttl::Ttl;

pub use hashing::HashingParams;

/// Active keys one owner may hold at once.
pub const MAX_ACTIVE_KEYS: usize = 20;

/// Upper bound on the permission set of a key.
pub const MAX_PERMISSIONS: usize = 3;

/// A freshly minted key plus the only copy of its token.
pub struct IssuedKey {
    pub key: ApiKey,
    pub token: String,
}

impl fmt::Debug for IssuedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedKey")
            .field("public_id", &self.key.public_id)
            .field("masked_key", &self.key.masked_key)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Validate a requested permission set.
///
/// Must be non-empty, at most [`MAX_PERMISSIONS`] long, duplicate-free and
/// drawn from the fixed vocabulary.
pub fn parse_permissions(raw: &[String]) -> Result<Vec<Permission>, LedgerError> {
    if raw.is_empty() {
        return Err(LedgerError::validation("At least one permission is required"));
    }
    if raw.len() > MAX_PERMISSIONS {
        return Err(LedgerError::validation(format!(
            "At most {MAX_PERMISSIONS} permissions are allowed"
        )));
    }

    let mut permissions = Vec::with_capacity(raw.len());
    for name in raw {
        let permission: Permission = name.parse().map_err(|unknown| {
            LedgerError::validation(format!(
                "Invalid permission `{unknown}`; allowed: deposit, transfer, read"
            ))
        })?;
        if permissions.contains(&permission) {
            return Err(LedgerError::validation(format!(
                "Duplicate permission `{permission}`"
            )));
        }
        permissions.push(permission);
    }
    Ok(permissions)
}

fn parse_ttl(raw: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, LedgerError> {
    let ttl: Ttl = raw
        .parse()
        .map_err(|e: crate::ttl::TtlError| LedgerError::validation(e.to_string()))?;
    ttl.expires_from(now)
        .map_err(|e| LedgerError::validation(e.to_string()))
}

pub struct CredentialAuthority {
    keys: Arc<dyn ApiKeyRepository>,
    params: HashingParams,
    env_tag: String,
}

impl CredentialAuthority {
    pub fn new(
        keys: Arc<dyn ApiKeyRepository>,
        params: HashingParams,
        env_tag: impl Into<String>,
    ) -> Self {
        Self {
            keys,
            params,
            env_tag: env_tag.into(),
        }
    }

    pub fn issue(
        &self,
        owner_user_id: &str,
        name: &str,
        permissions: &[String],
        ttl: &str,
    ) -> Result<IssuedKey, LedgerError> {
        self.issue_at(owner_user_id, name, permissions, ttl, Utc::now())
    }

    /// Issue a key as of `now`.
    pub fn issue_at(
        &self,
        owner_user_id: &str,
        name: &str,
        permissions: &[String],
        ttl: &str,
        now: DateTime<Utc>,
    ) -> Result<IssuedKey, LedgerError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LedgerError::validation("Key name must not be empty"));
        }
        let permissions = parse_permissions(permissions)?;
        let expires_at = parse_ttl(ttl, now)?;
        self.mint(owner_user_id, name, permissions, expires_at, now)
    }

    fn mint(
        &self,
        owner_user_id: &str,
        name: &str,
        permissions: Vec<Permission>,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<IssuedKey, LedgerError> {
        let raw_secret = secret::generate_secret();
        let public_id = secret::generate_public_id();
        let key_hash = hashing::hash_secret(&raw_secret, &self.params)
            .map_err(|e| LedgerError::Internal(e.to_string()))?;

        let key = ApiKey {
            key_hash,
            masked_key: secret::mask(&self.env_tag, &public_id, &raw_secret),
            public_id,
            owner_user_id: owner_user_id.to_string(),
            name: name.to_string(),
            permissions,
            revoked: false,
            expires_at: Some(expires_at),
            created_at: now,
            updated_at: now,
        };
        self.keys.insert_within_limit(&key, MAX_ACTIVE_KEYS, now)?;

        tracing::info!(
            owner_user_id = %owner_user_id,
            public_id = %key.public_id,
            expires_at = %expires_at,
            "API key issued"
        );

        let token = secret::encode_token(&self.env_tag, &key.public_id, &raw_secret);
        Ok(IssuedKey { key, token })
    }

    /// Look up a key by public id and check the secret against its hash.
    ///
    /// The lookup's read transaction is closed before hashing starts.
    /// Expiry and revocation are not considered here.
    pub fn verify(&self, public_id: &str, raw_secret: &str) -> Result<Option<ApiKey>, LedgerError> {
        let Some(key) = self.keys.find_by_public_id(public_id)? else {
            return Ok(None);
        };
        if hashing::verify_secret(raw_secret, &key.key_hash) {
            Ok(Some(key))
        } else {
            Ok(None)
        }
    }

    /// Resolve a full token to a key owned by `owner_user_id`.
    ///
    /// Foreign keys and failed verification both read as not found.
    pub fn resolve_owned(&self, owner_user_id: &str, token: &str) -> Result<ApiKey, LedgerError> {
        let parsed = secret::parse_token(token)
            .ok_or_else(|| LedgerError::validation("Malformed API key"))?;
        match self.verify(parsed.public_id, parsed.secret)? {
            Some(key) if key.owner_user_id == owner_user_id => Ok(key),
            _ => Err(LedgerError::not_found("API key not found")),
        }
    }

    /// Idempotently revoke.
    pub fn revoke(&self, key: &ApiKey) -> Result<ApiKey, LedgerError> {
        let revoked = self.keys.mark_revoked(&key.public_id)?;
        tracing::info!(
            owner_user_id = %revoked.owner_user_id,
            public_id = %revoked.public_id,
            "API key revoked"
        );
        Ok(revoked)
    }

    pub fn revoke_owned(&self, owner_user_id: &str, token: &str) -> Result<ApiKey, LedgerError> {
        let key = self.resolve_owned(owner_user_id, token)?;
        self.revoke(&key)
    }

    pub fn rollover(
        &self,
        owner_user_id: &str,
        expired_token: &str,
        ttl: &str,
        permissions: Option<&[String]>,
    ) -> Result<IssuedKey, LedgerError> {
        self.rollover_at(owner_user_id, expired_token, ttl, permissions, Utc::now())
    }

    /// Replace an expired key with a fresh one.
    ///
    /// Permissions default to the old key's. The old key is not revoked.
    pub fn rollover_at(
        &self,
        owner_user_id: &str,
        expired_token: &str,
        ttl: &str,
        permissions: Option<&[String]>,
        now: DateTime<Utc>,
    ) -> Result<IssuedKey, LedgerError> {
        let old = self.resolve_owned(owner_user_id, expired_token)?;
        if old.expires_at.is_none() || !old.is_expired_at(now) {
            return Err(LedgerError::conflict("API key has not expired yet"));
        }

        let permissions = match permissions {
            Some(raw) => parse_permissions(raw)?,
            None => old.permissions.clone(),
        };
        let expires_at = parse_ttl(ttl, now)?;

        let issued = self.mint(owner_user_id, &old.name, permissions, expires_at, now)?;
        tracing::info!(
            owner_user_id = %owner_user_id,
            old_public_id = %old.public_id,
            new_public_id = %issued.key.public_id,
            "API key rolled over"
        );
        Ok(issued)
    }

    /// Every key of `owner_user_id`, newest first.
    pub fn list(&self, owner_user_id: &str) -> Result<Vec<ApiKey>, LedgerError> {
        Ok(self.keys.list_by_owner(owner_user_id)?)
    }

    pub fn list_active_at(
        &self,
        owner_user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<ApiKey>, LedgerError> {
        Ok(self
            .list(owner_user_id)?
            .into_iter()
            .filter(|key| key.is_active_at(now))
            .collect())
    }
}

#[cfg(test)]
pub(crate) fn test_authority(db: Arc<crate::storage::LedgerDatabase>) -> CredentialAuthority {
    CredentialAuthority::new(db, HashingParams::fast_insecure(), "test")
}
