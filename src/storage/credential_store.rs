// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The credential store: account database plus its read cache.
//!
//! All mutations go through [`CredentialStore::apply`], which invalidates the
//! cache entry before returning. Callers therefore never see a mutation
//! complete while a stale snapshot is still served to the validation filter.

use std::path::Path;
use std::time::Duration;

use uuid::Uuid;

use super::account::{Account, AccountMutation};
use super::cache::AccountCache;
use super::database::{AccountDatabase, StoreResult};
use crate::auth::Role;

pub struct CredentialStore {
    db: AccountDatabase,
    cache: AccountCache,
}

impl CredentialStore {
    pub fn new(db: AccountDatabase, cache: AccountCache) -> Self {
        Self { db, cache }
    }

    /// Open the database at `path` with a fresh cache.
    pub fn open(path: &Path, cache_capacity: usize, cache_ttl: Duration) -> StoreResult<Self> {
        Ok(Self::new(
            AccountDatabase::open(path)?,
            AccountCache::new(cache_capacity, cache_ttl),
        ))
    }

    /// Persist a new account; fails with `AlreadyExists` on a taken login key
    /// and `NicknameTaken` on a taken nickname.
    pub fn create(&self, account: &Account) -> StoreResult<()> {
        self.db.insert_new(account)?;
        // A negative lookup is never cached, but be explicit.
        self.cache.invalidate(&account.login_key);
        Ok(())
    }

    pub fn nickname_taken(&self, nickname: &str) -> StoreResult<bool> {
        self.db.nickname_taken(nickname)
    }

    /// Uncached lookup, used where freshness matters more than speed (login).
    pub fn find_by_login_key(&self, login_key: &str) -> StoreResult<Option<Account>> {
        self.db.find_by_login_key(login_key)
    }

    /// Cached lookup used by the validation filter on every request.
    pub fn resolve_subject(&self, login_key: &str) -> StoreResult<Option<Account>> {
        if let Some(account) = self.cache.get(login_key) {
            return Ok(Some(account));
        }

        let epoch = self.cache.epoch();
        let account = self.db.find_by_login_key(login_key)?;
        if let Some(ref found) = account {
            self.cache.insert_if_unchanged(found.clone(), epoch);
        }
        Ok(account)
    }

    pub fn get(&self, id: Uuid) -> StoreResult<Option<Account>> {
        self.db.get(id)
    }

    /// Apply a security-relevant mutation; bumps the revocation counter and
    /// evicts the cached snapshot before returning.
    pub fn apply(&self, id: Uuid, mutation: &AccountMutation) -> StoreResult<Account> {
        let account = self.db.apply(id, mutation)?;
        self.cache.invalidate(&account.login_key);
        Ok(account)
    }

    pub fn list(&self) -> StoreResult<Vec<Account>> {
        self.db.list()
    }

    pub fn any_with_role(&self, role: Role) -> StoreResult<bool> {
        self.db.any_with_role(role)
    }

    pub fn ping(&self) -> StoreResult<()> {
        self.db.ping()
    }
}
