// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Argon2id hashing of API key secrets.
//!
//! Hashes are PHC strings, so the salt and cost parameters travel with the
//! hash and verification never depends on the current `HashingParams`.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashingParams {
    /// Iterations
    pub time_cost: u32,
    /// Memory in KiB
    pub memory_kib: u32,
    /// Lanes
    pub parallelism: u32,
}

impl HashingParams {
    /// Production profile: t=3, m=100 MiB, p=8.
    pub const fn production() -> Self {
        Self {
            time_cost: 3,
            memory_kib: 102_400,
            parallelism: 8,
        }
    }

    /// Minimum-cost profile for tests.
    pub const fn fast_insecure() -> Self {
        Self {
            time_cost: 1,
            memory_kib: 8,
            parallelism: 1,
        }
    }

    fn hasher(&self) -> Result<Argon2<'static>, argon2::Error> {
        let params = Params::new(self.memory_kib, self.time_cost, self.parallelism, None)?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

impl Default for HashingParams {
    fn default() -> Self {
        Self::production()
    }
}

#[derive(Debug, thiserror::Error)]
#[error("secret hashing failed: {0}")]
pub struct HashingError(String);

/// Hash a secret with a fresh random salt. Returns a PHC string.
pub fn hash_secret(secret: &str, params: &HashingParams) -> Result<String, HashingError> {
    let salt = SaltString::generate(&mut OsRng);
    let hasher = params
        .hasher()
        .map_err(|e| HashingError(e.to_string()))?;
    hasher
        .hash_password(secret.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| HashingError(e.to_string()))
}

/// Check a secret against a stored PHC hash.
///
/// The digest comparison inside `argon2` is constant time. A malformed
/// stored hash verifies as `false`.
pub fn verify_secret(secret: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(secret.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_verifies_only_the_hashed_secret() {
        let params = HashingParams::fast_insecure();
        let hash = hash_secret("correct horse", &params).unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains("correct horse"));
        assert!(verify_secret("correct horse", &hash));
        assert!(!verify_secret("correct horsf", &hash));
    }

    #[test]
    fn same_secret_hashes_differently() {
        let params = HashingParams::fast_insecure();
        let a = hash_secret("s3cret", &params).unwrap();
        let b = hash_secret("s3cret", &params).unwrap();
        assert_ne!(a, b, "salts must differ");
        assert!(verify_secret("s3cret", &a) && verify_secret("s3cret", &b));
    }

    #[test]
    fn params_are_embedded_in_the_hash() {
        let hash = hash_secret("x", &HashingParams::fast_insecure()).unwrap();
        assert!(hash.contains("m=8,t=1,p=1"));
    }

    #[test]
    fn garbage_hash_never_verifies() {
        assert!(!verify_secret("x", "not-a-phc-string"));
        assert!(!verify_secret("x", ""));
    }
}
