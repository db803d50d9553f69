// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! API key token format.
//!
//! ```text
//! sk_<env>_<public_id>_<secret>
//! ```
//!
//! `public_id` is a 32-hex UUID and `secret` is 32 random bytes in unpadded
//! base64url. The base64url alphabet includes `_`, so parsing splits on the
//! first three underscores only and keeps the remainder as the secret.

use std::fmt;

use argon2::password_hash::rand_core::{OsRng, RngCore};
use base64ct::{Base64UrlUnpadded, Encoding};
use uuid::Uuid;

const PREFIX: &str = "sk";
const SECRET_BYTES: usize = 32;

/// Fresh 256-bit secret.
pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    OsRng.fill_bytes(&mut bytes);
    Base64UrlUnpadded::encode_string(&bytes)
}

pub fn generate_public_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Caller-facing token carrying the raw secret.
pub fn encode_token(env_tag: &str, public_id: &str, secret: &str) -> String {
    format!("{PREFIX}_{env_tag}_{public_id}_{secret}")
}

/// Display form: `sk_<env>_<first 5 of id>_***<last 3 of secret>`.
pub fn mask(env_tag: &str, public_id: &str, secret: &str) -> String {
    let id_head: String = public_id.chars().take(5).collect();
    let tail_start = secret.len().saturating_sub(3);
    let secret_tail = secret.get(tail_start..).unwrap_or_default();
    format!("{PREFIX}_{env_tag}_{id_head}_***{secret_tail}")
}

/// A presented token split into its parts.
#[derive(Clone, PartialEq, Eq)]
pub struct ParsedToken<'a> {
    pub env_tag: &'a str,
    pub public_id: &'a str,
    pub secret: &'a str,
}

impl fmt::Debug for ParsedToken<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParsedToken")
            .field("env_tag", &self.env_tag)
            .field("public_id", &self.public_id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Split a token; `None` for anything that is not four non-empty segments
/// behind the `sk` prefix.
pub fn parse_token(token: &str) -> Option<ParsedToken<'_>> {
    let mut parts = token.trim().splitn(4, '_');
    let prefix = parts.next()?;
    let env_tag = parts.next()?;
    let public_id = parts.next()?;
    let secret = parts.next()?;

    if prefix != PREFIX || env_tag.is_empty() || public_id.is_empty() || secret.is_empty() {
        return None;
    }
    Some(ParsedToken {
        env_tag,
        public_id,
        secret,
    })
}
