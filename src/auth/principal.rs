// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request-scoped caller identity.

use serde::Serialize;

use crate::error::LedgerError;
use crate::models::Permission;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalKind {
    /// Interactive session; implicitly holds every permission
    User,
    /// API key holder; limited to the key's permission set
    Service,
}

/// Resolved caller for one request. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub kind: PrincipalKind,
    pub user_id: String,
    pub permissions: Vec<Permission>,
}

impl Principal {
    pub fn user(user_id: impl Into<String>) -> Self {
        Self {
            kind: PrincipalKind::User,
            user_id: user_id.into(),
            permissions: Vec::new(),
        }
    }

    pub fn service(user_id: impl Into<String>, permissions: Vec<Permission>) -> Self {
        Self {
            kind: PrincipalKind::Service,
            user_id: user_id.into(),
            permissions,
        }
    }

    /// No-op for users; strict membership check for services.
    pub fn require_permission(&self, permission: Permission) -> Result<(), LedgerError> {
        match self.kind {
            PrincipalKind::User => Ok(()),
            PrincipalKind::Service if self.permissions.contains(&permission) => Ok(()),
            PrincipalKind::Service => Err(LedgerError::missing_permission(permission)),
        }
    }

    /// Key management is only open to interactive sessions.
    pub fn require_user(&self) -> Result<(), LedgerError> {
        match self.kind {
            PrincipalKind::User => Ok(()),
            PrincipalKind::Service => Err(LedgerError::forbidden(
                "API keys cannot manage API keys; use a session token",
            )),
        }
    }
}
