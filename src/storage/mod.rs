// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Credential Storage Module
//!
//! Persistent accounts in an embedded redb database, with an LRU read cache
//! in front of the login-key lookup used by token validation.
//!
//! ## Storage Layout
//!
//! ```text
//! $DATA_DIR/
//!   accounts.redb
//!     accounts          # account id -> Account (JSON)
//!     login_key_index   # login key  -> account id
//! ```
//!
//! ## Important Notes
//!
//! - Accounts change only through [`AccountMutation`], and every mutation
//!   advances the revocation counter in the same write transaction
//! - The cache entry for an account is dropped before a mutation returns
//! - Login keys are compared byte for byte; no case folding

pub mod account;
pub mod cache;
pub mod credential_store;
pub mod database;

pub use account::{Account, AccountMutation};
pub use cache::AccountCache;
pub use credential_store::CredentialStore;
pub use database::{AccountDatabase, StoreError, StoreResult};
