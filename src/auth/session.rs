// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session token verification.
//!
//! Session tokens are issued by the login flow (not part of this service)
//! as HS256 JWTs signed with `SESSION_TOKEN_SECRET`. Only `sub`, `exp` and
//! an optional `email` are read.

use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use super::AuthError;

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Identity carried by a valid session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub user_id: String,
    pub email: Option<String>,
}

/// Turns an opaque session token into a user identity.
pub trait SessionVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<SessionIdentity, AuthError>;
}

#[derive(Debug, Deserialize)]
struct SessionClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    /// Validated by jsonwebtoken, not read directly
    #[serde(default)]
    #[allow(dead_code)]
    exp: i64,
}

pub struct JwtSessionVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtSessionVerifier {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = CLOCK_SKEW_LEEWAY;
        validation.validate_aud = false;
        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }
}

impl SessionVerifier for JwtSessionVerifier {
    fn verify(&self, token: &str) -> Result<SessionIdentity, AuthError> {
        let token_data = decode::<SessionClaims>(token, &self.key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                _ => AuthError::MalformedToken,
            })?;

        let claims = token_data.claims;
        if claims.sub.trim().is_empty() {
            return Err(AuthError::MalformedToken);
        }
        Ok(SessionIdentity {
            user_id: claims.sub,
            email: claims.email.filter(|email| !email.trim().is_empty()),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;

    pub(crate) const TEST_SECRET: &[u8] = b"session-secret-for-tests";

    #[derive(Serialize)]
    struct Claims<'a> {
        sub: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        email: Option<&'a str>,
        exp: i64,
    }

    /// Mint a session token the way the login flow would.
    pub(crate) fn mint(secret: &[u8], sub: &str, email: Option<&str>, exp_offset_secs: i64) -> String {
        let exp = chrono::Utc::now().timestamp() + exp_offset_secs;
        encode(
            &Header::new(Algorithm::HS256),
            &Claims { sub, email, exp },
            &EncodingKey::from_secret(secret),
        )
        .unwrap()
    }

    #[test]
    fn valid_token_yields_identity() {
        let verifier = JwtSessionVerifier::new(TEST_SECRET);
        let token = mint(TEST_SECRET, "user-1", Some("a@example.com"), 3600);

        let identity = verifier.verify(&token).unwrap();
        assert_eq!(identity.user_id, "user-1");
        assert_eq!(identity.email.as_deref(), Some("a@example.com"));
    }

    #[test]
    fn expired_token_is_rejected() {
        let verifier = JwtSessionVerifier::new(TEST_SECRET);
        let token = mint(TEST_SECRET, "user-1", None, -3600);
        assert_eq!(verifier.verify(&token), Err(AuthError::TokenExpired));
    }

    #[test]
    fn expiry_within_leeway_is_tolerated() {
        let verifier = JwtSessionVerifier::new(TEST_SECRET);
        let token = mint(TEST_SECRET, "user-1", None, -10);
        assert!(verifier.verify(&token).is_ok());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let verifier = JwtSessionVerifier::new(TEST_SECRET);
        let token = mint(b"someone-else", "user-1", None, 3600);
        assert_eq!(verifier.verify(&token), Err(AuthError::InvalidSignature));
    }

    #[test]
    fn garbage_is_malformed() {
        let verifier = JwtSessionVerifier::new(TEST_SECRET);
        assert_eq!(verifier.verify("not.a.jwt"), Err(AuthError::MalformedToken));
    }
}
