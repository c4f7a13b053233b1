// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded account database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `accounts`: account id → serialized [`Account`] (JSON bytes)
//! - `login_key_index`: login key → account id
//! - `nickname_index`: nickname → account id (only accounts that chose one)
//!
//! redb allows a single write transaction at a time, so the uniqueness check
//! in [`AccountDatabase::insert_new`] and the read-modify-write in
//! [`AccountDatabase::apply`] are serialized against every other writer.

use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use uuid::Uuid;

use super::account::{Account, AccountMutation};
use crate::auth::Role;

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: account id → serialized Account (JSON bytes).
const ACCOUNTS: TableDefinition<&str, &[u8]> = TableDefinition::new("accounts");

/// Unique index: login key (exact, case-sensitive) → account id.
const LOGIN_KEY_INDEX: TableDefinition<&str, &str> = TableDefinition::new("login_key_index");

/// Unique index: nickname (exact) → account id.
const NICKNAME_INDEX: TableDefinition<&str, &str> = TableDefinition::new("nickname_index");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("login key already registered: {0}")]
    AlreadyExists(String),

    #[error("nickname already taken: {0}")]
    NicknameTaken(String),

    #[error("account not found: {0}")]
    NotFound(Uuid),

    #[error("index points at missing account {0}")]
    DanglingIndex(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// AccountDatabase
// =============================================================================

/// Embedded ACID account database.
pub struct AccountDatabase {
    db: Database,
}

impl AccountDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ACCOUNTS)?;
            let _ = write_txn.open_table(LOGIN_KEY_INDEX)?;
            let _ = write_txn.open_table(NICKNAME_INDEX)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Insert a new account, failing if its login key or nickname is taken.
    ///
    /// Both checks and the insert share one write transaction; an early
    /// return drops it uncommitted.
    pub fn insert_new(&self, account: &Account) -> StoreResult<()> {
        let json = serde_json::to_vec(account)?;
        let id = account.id.to_string();

        let write_txn = self.db.begin_write()?;
        {
            let mut index = write_txn.open_table(LOGIN_KEY_INDEX)?;
            if index.get(account.login_key.as_str())?.is_some() {
                return Err(StoreError::AlreadyExists(account.login_key.clone()));
            }
            index.insert(account.login_key.as_str(), id.as_str())?;

            if let Some(nickname) = account.nickname.as_deref() {
                let mut nicknames = write_txn.open_table(NICKNAME_INDEX)?;
                if nicknames.get(nickname)?.is_some() {
                    return Err(StoreError::NicknameTaken(nickname.to_string()));
                }
                nicknames.insert(nickname, id.as_str())?;
            }

            let mut accounts = write_txn.open_table(ACCOUNTS)?;
            accounts.insert(id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn nickname_taken(&self, nickname: &str) -> StoreResult<bool> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(NICKNAME_INDEX)?;
        Ok(index.get(nickname)?.is_some())
    }

    /// Look up an account by id.
    pub fn get(&self, id: Uuid) -> StoreResult<Option<Account>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ACCOUNTS)?;
        match table.get(id.to_string().as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Look up an account by exact login key.
    pub fn find_by_login_key(&self, login_key: &str) -> StoreResult<Option<Account>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(LOGIN_KEY_INDEX)?;
        let id = match index.get(login_key)? {
            Some(value) => value.value().to_string(),
            None => return Ok(None),
        };

        let accounts = read_txn.open_table(ACCOUNTS)?;
        match accounts.get(id.as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Err(StoreError::DanglingIndex(id)),
        }
    }

    /// Apply a mutation inside one write transaction and return the result.
    pub fn apply(&self, id: Uuid, mutation: &AccountMutation) -> StoreResult<Account> {
        let key = id.to_string();

        let write_txn = self.db.begin_write()?;
        let account = {
            let mut accounts = write_txn.open_table(ACCOUNTS)?;
            let bytes = match accounts.get(key.as_str())? {
                Some(value) => value.value().to_vec(),
                None => return Err(StoreError::NotFound(id)),
            };

            let mut account: Account = serde_json::from_slice(&bytes)?;
            account.apply(mutation);

            let json = serde_json::to_vec(&account)?;
            accounts.insert(key.as_str(), json.as_slice())?;
            account
        };
        write_txn.commit()?;
        Ok(account)
    }

    /// All accounts, ordered by creation time.
    pub fn list(&self) -> StoreResult<Vec<Account>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ACCOUNTS)?;

        let mut accounts = Vec::new();
        for entry in table.iter()? {
            let (_key, value) = entry?;
            accounts.push(serde_json::from_slice::<Account>(value.value())?);
        }
        accounts.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(accounts)
    }

    /// Whether at least one account holds `role`.
    pub fn any_with_role(&self, role: Role) -> StoreResult<bool> {
        Ok(self.list()?.iter().any(|a| a.role == role))
    }

    /// Open and drop a read transaction; used by readiness checks.
    pub fn ping(&self) -> StoreResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(ACCOUNTS)?;
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn temp_db() -> (tempfile::TempDir, AccountDatabase) {
        let dir = tempfile::tempdir().unwrap();
        let db = AccountDatabase::open(&dir.path().join("accounts.redb")).unwrap();
        (dir, db)
    }

    fn account(login_key: &str) -> Account {
        Account::new(login_key.into(), "hash".into(), Role::Student)
    }

    #[test]
    fn insert_and_lookup() {
        let (_dir, db) = temp_db();
        let a = account("a@x.com");
        db.insert_new(&a).unwrap();

        assert_eq!(db.get(a.id).unwrap().unwrap(), a);
        assert_eq!(db.find_by_login_key("a@x.com").unwrap().unwrap(), a);
        assert!(db.find_by_login_key("b@x.com").unwrap().is_none());
        assert!(db.get(Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn login_key_lookup_is_case_sensitive() {
        let (_dir, db) = temp_db();
        db.insert_new(&account("a@x.com")).unwrap();
        assert!(db.find_by_login_key("A@X.COM").unwrap().is_none());
        // A differently cased key is a distinct identity.
        db.insert_new(&account("A@X.COM")).unwrap();
    }

    #[test]
    fn duplicate_login_key_is_rejected() {
        let (_dir, db) = temp_db();
        db.insert_new(&account("a@x.com")).unwrap();

        let err = db.insert_new(&account("a@x.com")).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(ref k) if k == "a@x.com"));
        assert_eq!(db.list().unwrap().len(), 1);
    }

    #[test]
    fn concurrent_registration_yields_one_winner() {
        let (_dir, db) = temp_db();
        let db = Arc::new(db);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let db = db.clone();
                std::thread::spawn(move || db.insert_new(&account("race@x.com")))
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let winners = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, StoreError::AlreadyExists(_))));
        assert_eq!(db.list().unwrap().len(), 1);
    }

    #[test]
    fn duplicate_nickname_is_rejected_without_side_effects() {
        let (_dir, db) = temp_db();
        db.insert_new(&account("a@x.com").with_nickname(Some("alex".into())))
            .unwrap();
        assert!(db.nickname_taken("alex").unwrap());

        let err = db
            .insert_new(&account("b@x.com").with_nickname(Some("alex".into())))
            .unwrap_err();
        assert!(matches!(err, StoreError::NicknameTaken(ref n) if n == "alex"));

        // The aborted transaction must not leave b@x.com in the login index.
        assert!(db.find_by_login_key("b@x.com").unwrap().is_none());
        db.insert_new(&account("b@x.com")).unwrap();
        assert_eq!(db.list().unwrap().len(), 2);
    }

    #[test]
    fn accounts_without_nickname_do_not_collide() {
        let (_dir, db) = temp_db();
        db.insert_new(&account("a@x.com")).unwrap();
        db.insert_new(&account("b@x.com")).unwrap();
        assert!(!db.nickname_taken("").unwrap());
    }

    #[test]
    fn apply_persists_and_bumps_counter() {
        let (_dir, db) = temp_db();
        let a = account("a@x.com");
        db.insert_new(&a).unwrap();

        let updated = db.apply(a.id, &AccountMutation::Lock).unwrap();
        assert!(updated.locked);
        assert_eq!(updated.revocation_counter, 1);

        let stored = db.find_by_login_key("a@x.com").unwrap().unwrap();
        assert_eq!(stored, updated);
    }

    #[test]
    fn apply_unknown_id_is_not_found() {
        let (_dir, db) = temp_db();
        let id = Uuid::new_v4();
        let err = db.apply(id, &AccountMutation::Disable).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(missing) if missing == id));
    }

    #[test]
    fn concurrent_mutations_are_serialized() {
        let (_dir, db) = temp_db();
        let a = account("a@x.com");
        db.insert_new(&a).unwrap();
        let db = Arc::new(db);

        let handles: Vec<_> = (0..10)
            .map(|i| {
                let db = db.clone();
                let role = if i % 2 == 0 { Role::Moderator } else { Role::Applicant };
                std::thread::spawn(move || db.apply(a.id, &AccountMutation::ChangeRole(role)))
            })
            .collect();
        for h in handles {
            h.join().unwrap().unwrap();
        }

        assert_eq!(db.get(a.id).unwrap().unwrap().revocation_counter, 10);
    }

    #[test]
    fn list_and_role_queries() {
        let (_dir, db) = temp_db();
        db.insert_new(&account("a@x.com")).unwrap();
        let admin = Account::new("root@x.com".into(), "hash".into(), Role::Admin);
        assert!(!db.any_with_role(Role::Admin).unwrap());
        db.insert_new(&admin).unwrap();

        assert_eq!(db.list().unwrap().len(), 2);
        assert!(db.any_with_role(Role::Admin).unwrap());
        db.ping().unwrap();
    }

    #[test]
    fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("accounts.redb");
        let a = account("a@x.com");
        {
            let db = AccountDatabase::open(&path).unwrap();
            db.insert_new(&a).unwrap();
            db.apply(a.id, &AccountMutation::Disable).unwrap();
        }
        let db = AccountDatabase::open(&path).unwrap();
        let stored = db.get(a.id).unwrap().unwrap();
        assert!(!stored.enabled);
        assert_eq!(stored.revocation_counter, 1);
    }
}
