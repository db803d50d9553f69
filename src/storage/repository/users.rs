// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Local cache of identity attributes.
//!
//! The identity provider owns users; the ledger only remembers what it needs
//! to talk to the payment provider on a user's behalf.

use redb::ReadableDatabase;

use super::super::database::{get_json, LedgerDatabase, StoreResult, USERS};
use crate::models::UserProfile;

pub trait UserDirectory: Send + Sync {
    /// Insert or replace the cached profile.
    fn upsert_user(&self, profile: &UserProfile) -> StoreResult<()>;

    fn find_user(&self, user_id: &str) -> StoreResult<Option<UserProfile>>;

    /// Contact email the payment provider needs, if one is known.
    fn email_for(&self, user_id: &str) -> StoreResult<Option<String>> {
        Ok(self
            .find_user(user_id)?
            .map(|profile| profile.email)
            .filter(|email| !email.trim().is_empty()))
    }
}

impl UserDirectory for LedgerDatabase {
    fn upsert_user(&self, profile: &UserProfile) -> StoreResult<()> {
        let json = serde_json::to_vec(profile)?;
        let write_txn = self.db().begin_write()?;
        {
            let mut users = write_txn.open_table(USERS)?;
            users.insert(profile.user_id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn find_user(&self, user_id: &str) -> StoreResult<Option<UserProfile>> {
        let read_txn = self.db().begin_read()?;
        let users = read_txn.open_table(USERS)?;
        get_json(&users, user_id)
    }
}
