// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! LRU cache for login-key → account lookups.
//!
//! The validation filter resolves the token subject on every request; this
//! cache spares it a redb read transaction for hot accounts. Entries are
//! removed synchronously by every account mutation, and the TTL only bounds
//! staleness for entries no mutation touched.
//!
//! A reader that loaded an account from the database must not put it back
//! after a concurrent mutation already invalidated that key. Readers record
//! the cache epoch before reading the database and the insert is refused if
//! any invalidation happened in between.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;

use super::account::Account;

struct CacheEntry {
    account: Account,
    inserted_at: Instant,
}

struct Inner {
    entries: LruCache<String, CacheEntry>,
    epoch: u64,
}

/// In-process LRU cache for account snapshots, keyed by exact login key.
pub struct AccountCache {
    inner: Mutex<Inner>,
    ttl: Duration,
}

impl AccountCache {
    /// Create a new cache with the given capacity and TTL.
    ///
    /// - `capacity`: Max number of accounts to cache (at least one).
    /// - `ttl`: Time-to-live for each cache entry.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
                epoch: 0,
            }),
            ttl,
        }
    }

    /// Get the cached account for a login key.
    ///
    /// Returns `None` if not cached or expired.
    pub fn get(&self, login_key: &str) -> Option<Account> {
        let mut inner = self.inner.lock().ok()?;
        if let Some(entry) = inner.entries.get(login_key) {
            if entry.inserted_at.elapsed() < self.ttl {
                return Some(entry.account.clone());
            }
            // Expired, remove it
            inner.entries.pop(login_key);
        }
        None
    }

    /// Current invalidation epoch. Read this before loading from the database.
    pub fn epoch(&self) -> u64 {
        self.inner.lock().map(|inner| inner.epoch).unwrap_or(u64::MAX)
    }

    /// Store an account loaded while the epoch was `observed_epoch`.
    ///
    /// Returns `false` (and stores nothing) if an invalidation happened since.
    pub fn insert_if_unchanged(&self, account: Account, observed_epoch: u64) -> bool {
        let Ok(mut inner) = self.inner.lock() else {
            return false;
        };
        if inner.epoch != observed_epoch {
            return false;
        }
        inner.entries.put(
            account.login_key.clone(),
            CacheEntry {
                account,
                inserted_at: Instant::now(),
            },
        );
        true
    }

    /// Drop the entry for a login key and advance the epoch.
    pub fn invalidate(&self, login_key: &str) {
        match self.inner.lock() {
            Ok(mut inner) => {
                inner.entries.pop(login_key);
                inner.epoch = inner.epoch.wrapping_add(1);
            }
            Err(poisoned) => {
                // A panicked holder may have left a stale entry; drop them all.
                let mut inner = poisoned.into_inner();
                inner.entries.clear();
                inner.epoch = inner.epoch.wrapping_add(1);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|inner| inner.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
