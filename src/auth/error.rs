// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.
//!
//! Rendered over HTTP through `LedgerError::Authentication` as 401.

/// Why a request could not be attributed to a principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Neither a session token nor an API key was presented
    MissingCredentials,
    /// Authorization header present but not `Bearer <token>`
    InvalidAuthHeader,
    /// Session token could not be decoded
    MalformedToken,
    /// Session token signature is invalid
    InvalidSignature,
    /// Session token has expired
    TokenExpired,
    /// API key is not `sk_<env>_<id>_<secret>`
    MalformedApiKey,
    /// Unknown API key or wrong secret
    InvalidApiKey,
    ApiKeyExpired,
    ApiKeyRevoked,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingCredentials => "missing_credentials",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::MalformedToken => "malformed_token",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::TokenExpired => "token_expired",
            AuthError::MalformedApiKey => "malformed_api_key",
            AuthError::InvalidApiKey => "invalid_api_key",
            AuthError::ApiKeyExpired => "api_key_expired",
            AuthError::ApiKeyRevoked => "api_key_revoked",
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingCredentials => {
                write!(f, "Authentication required (Bearer token or x-api-key)")
            }
            AuthError::InvalidAuthHeader => {
                write!(f, "Invalid authorization header format (expected 'Bearer <token>')")
            }
            AuthError::MalformedToken => write!(f, "Token is malformed"),
            AuthError::InvalidSignature => write!(f, "Token signature is invalid"),
            AuthError::TokenExpired => write!(f, "Token has expired"),
            AuthError::MalformedApiKey => write!(f, "API key is malformed"),
            AuthError::InvalidApiKey => write!(f, "Invalid API key"),
            AuthError::ApiKeyExpired => write!(f, "API key has expired"),
            AuthError::ApiKeyRevoked => write!(f, "API key has been revoked"),
        }
    }
}

impl std::error::Error for AuthError {}
