// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Every ledger operation runs on behalf of a [`Principal`].
//!
//! ## Auth Flow
//!
//! 1. Caller sends `Authorization: Bearer <session token>` or
//!    `x-api-key: sk_<env>_<id>_<secret>`
//! 2. Session tokens are verified as HS256 JWTs; `sub` becomes the user id
//!    and the principal holds every permission
//! 3. API keys are parsed, verified against their Argon2id hash and checked
//!    for revocation and expiry; the principal holds the key's permissions
//!
//! ## Security
//!
//! - Session token wins when both credentials are present
//! - Clock skew tolerance is 60 seconds
//! - Key verification runs on the blocking pool, outside any database lock
//! - Secrets are never logged

pub mod error;
pub mod extractor;
pub mod principal;
pub mod resolver;
pub mod session;

pub use error::AuthError;
pub use extractor::{Authenticated, API_KEY_HEADER};
pub use principal::{Principal, PrincipalKind};
pub use resolver::PrincipalResolver;
pub use session::{JwtSessionVerifier, SessionIdentity, SessionVerifier};
