// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! API key repository.
//!
//! Keys are stored under their Argon2 hash. Two indexes sit beside them:
//! `api_key_ids` resolves the public id embedded in a presented key, and
//! `api_key_owners` lists a user's keys newest first.

use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableTable};

use super::super::database::{
    get_json, get_str, make_index_key, make_prefix, make_prefix_end, LedgerDatabase, StoreError,
    StoreResult, API_KEYS, API_KEY_IDS, API_KEY_OWNERS,
};
use crate::models::ApiKey;

pub trait ApiKeyRepository: Send + Sync {
    /// Insert `key` unless its owner already holds `limit` active keys.
    ///
    /// Counting and inserting share one write transaction, so concurrent
    /// issuance can never push an owner past the limit.
    fn insert_within_limit(
        &self,
        key: &ApiKey,
        limit: usize,
        now: DateTime<Utc>,
    ) -> StoreResult<()>;

    fn find_by_public_id(&self, public_id: &str) -> StoreResult<Option<ApiKey>>;

    /// Every key of `owner`, newest first.
    fn list_by_owner(&self, owner_user_id: &str) -> StoreResult<Vec<ApiKey>>;

    /// Set the revoked flag. Revoking twice is a no-op.
    fn mark_revoked(&self, public_id: &str) -> StoreResult<ApiKey>;
}

impl ApiKeyRepository for LedgerDatabase {
    fn insert_within_limit(
        &self,
        key: &ApiKey,
        limit: usize,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        let json = serde_json::to_vec(key)?;

        let write_txn = self.db().begin_write()?;
        {
            let mut keys = write_txn.open_table(API_KEYS)?;
            let mut ids = write_txn.open_table(API_KEY_IDS)?;
            let mut owners = write_txn.open_table(API_KEY_OWNERS)?;

            let prefix = make_prefix(&key.owner_user_id);
            let prefix_end = make_prefix_end(&key.owner_user_id);
            let mut active = 0usize;
            for entry in owners.range(prefix.as_slice()..prefix_end.as_slice())? {
                let (_, hash) = entry?;
                if let Some(existing) = get_json::<ApiKey>(&keys, hash.value())? {
                    if existing.is_active_at(now) {
                        active += 1;
                    }
                }
            }
            if active >= limit {
                return Err(StoreError::CapacityExceeded { limit });
            }

            if keys.get(key.key_hash.as_str())?.is_some()
                || ids.get(key.public_id.as_str())?.is_some()
            {
                return Err(StoreError::Conflict(format!("API key {}", key.public_id)));
            }

            keys.insert(key.key_hash.as_str(), json.as_slice())?;
            ids.insert(key.public_id.as_str(), key.key_hash.as_str())?;
            let owner_key = make_index_key(
                &key.owner_user_id,
                key.created_at.timestamp_micros(),
                &key.public_id,
            );
            owners.insert(owner_key.as_slice(), key.key_hash.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn find_by_public_id(&self, public_id: &str) -> StoreResult<Option<ApiKey>> {
        let read_txn = self.db().begin_read()?;
        let ids = read_txn.open_table(API_KEY_IDS)?;
        let Some(hash) = get_str(&ids, public_id)? else {
            return Ok(None);
        };
        let keys = read_txn.open_table(API_KEYS)?;
        get_json(&keys, &hash)
    }

    fn list_by_owner(&self, owner_user_id: &str) -> StoreResult<Vec<ApiKey>> {
        let read_txn = self.db().begin_read()?;
        let owners = read_txn.open_table(API_KEY_OWNERS)?;
        let keys = read_txn.open_table(API_KEYS)?;

        let prefix = make_prefix(owner_user_id);
        let prefix_end = make_prefix_end(owner_user_id);

        let mut listed = Vec::new();
        for entry in owners.range(prefix.as_slice()..prefix_end.as_slice())? {
            let (_, hash) = entry?;
            if let Some(key) = get_json::<ApiKey>(&keys, hash.value())? {
                listed.push(key);
            }
        }
        Ok(listed)
    }

    fn mark_revoked(&self, public_id: &str) -> StoreResult<ApiKey> {
        let write_txn = self.db().begin_write()?;
        let key = {
            let ids = write_txn.open_table(API_KEY_IDS)?;
            let hash = get_str(&ids, public_id)?
                .ok_or_else(|| StoreError::NotFound(format!("API key {public_id}")))?;

            let mut keys = write_txn.open_table(API_KEYS)?;
            let mut key: ApiKey = get_json(&keys, &hash)?
                .ok_or_else(|| StoreError::NotFound(format!("API key {public_id}")))?;

            if !key.revoked {
                key.revoked = true;
                key.updated_at = Utc::now();
                keys.insert(hash.as_str(), serde_json::to_vec(&key)?.as_slice())?;
            }
            key
        };
        write_txn.commit()?;
        Ok(key)
    }
}
