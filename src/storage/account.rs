// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account record and the closed set of security-relevant mutations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Role;

/// A persisted user account.
///
/// Fields are public for reading. Security-relevant state changes go through
/// [`Account::apply`], which is the only code path that advances
/// `revocation_counter`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Stable account id.
    pub id: Uuid,
    /// Unique, case-sensitive email. Never changes.
    pub login_key: String,
    /// Optional public display name; unique when present.
    #[serde(default)]
    pub nickname: Option<String>,
    /// bcrypt hash of the current password.
    pub credential_hash: String,
    pub role: Role,
    pub enabled: bool,
    pub locked: bool,
    /// Bumped by every mutation; tokens carry a snapshot of it.
    pub revocation_counter: u64,
    pub created_at: DateTime<Utc>,
}

/// Security-relevant change to an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountMutation {
    ReplaceCredential { credential_hash: String },
    ChangeRole(Role),
    Disable,
    Enable,
    Lock,
    Unlock,
}

impl AccountMutation {
    /// Short name for logs and audit events.
    pub fn name(&self) -> &'static str {
        match self {
            AccountMutation::ReplaceCredential { .. } => "replace_credential",
            AccountMutation::ChangeRole(_) => "change_role",
            AccountMutation::Disable => "disable",
            AccountMutation::Enable => "enable",
            AccountMutation::Lock => "lock",
            AccountMutation::Unlock => "unlock",
        }
    }
}

impl Account {
    /// New enabled, unlocked account with a zero revocation counter.
    pub fn new(login_key: String, credential_hash: String, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            login_key,
            nickname: None,
            credential_hash,
            role,
            enabled: true,
            locked: false,
            revocation_counter: 0,
            created_at: Utc::now(),
        }
    }

    pub fn with_nickname(mut self, nickname: Option<String>) -> Self {
        self.nickname = nickname;
        self
    }

    /// Both status flags are in their usable state.
    pub fn is_usable(&self) -> bool {
        self.enabled && !self.locked
    }

    /// Apply a mutation and advance the revocation counter.
    ///
    /// The counter moves even when the mutation leaves the fields unchanged
    /// (disabling a disabled account), so every call revokes outstanding
    /// tokens.
    pub fn apply(&mut self, mutation: &AccountMutation) {
        match mutation {
            AccountMutation::ReplaceCredential { credential_hash } => {
                self.credential_hash = credential_hash.clone();
            }
            AccountMutation::ChangeRole(role) => self.role = *role,
            AccountMutation::Disable => self.enabled = false,
            AccountMutation::Enable => self.enabled = true,
            AccountMutation::Lock => self.locked = true,
            AccountMutation::Unlock => self.locked = false,
        }
        self.revocation_counter = self.revocation_counter.saturating_add(1);
    }
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("login_key", &self.login_key)
            .field("nickname", &self.nickname)
            .field("role", &self.role)
            .field("enabled", &self.enabled)
            .field("locked", &self.locked)
            .field("revocation_counter", &self.revocation_counter)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}
