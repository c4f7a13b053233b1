// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication service: registration, login and account mutations.
//!
//! Every mutation funnels into [`CredentialStore::apply`], so each one bumps
//! the revocation counter and evicts the cached account before returning.
//! bcrypt work runs on the blocking pool to keep the async workers free.

use std::sync::Arc;

use uuid::Uuid;

use super::audit::{AuditEvent, AuditEventType};
use super::codec::{IssuedToken, TokenCodec};
use super::error::RejectReason;
use super::password::PasswordHasher;
use super::{AuthError, AuthenticatedUser, Role};
use crate::storage::{Account, AccountMutation, CredentialStore, StoreError};

pub struct AuthService {
    store: Arc<CredentialStore>,
    hasher: PasswordHasher,
    codec: Arc<TokenCodec>,
    token_ttl: chrono::Duration,
}

impl AuthService {
    pub fn new(
        store: Arc<CredentialStore>,
        hasher: PasswordHasher,
        codec: Arc<TokenCodec>,
        token_ttl: chrono::Duration,
    ) -> Self {
        Self {
            store,
            hasher,
            codec,
            token_ttl,
        }
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    /// Create a `Student` account, optionally with a public nickname.
    ///
    /// # Errors
    ///
    /// `DuplicateIdentity` if the login key is taken and `DuplicateNickname`
    /// if the nickname is, including when another registration wins a race.
    pub async fn register(
        &self,
        login_key: &str,
        plaintext: &str,
        nickname: Option<&str>,
    ) -> Result<Account, AuthError> {
        self.create_account(login_key, plaintext, nickname, Role::default())
            .await
            .inspect(|account| {
                AuditEvent::new(AuditEventType::AccountRegistered)
                    .with_target(account.id.to_string())
                    .emit();
            })
    }

    async fn create_account(
        &self,
        login_key: &str,
        plaintext: &str,
        nickname: Option<&str>,
        role: Role,
    ) -> Result<Account, AuthError> {
        // Skip the expensive hash for the common duplicate cases; the insert
        // below still settles races.
        if self.store.find_by_login_key(login_key)?.is_some() {
            return Err(AuthError::DuplicateIdentity);
        }
        if let Some(nickname) = nickname {
            if self.store.nickname_taken(nickname)? {
                return Err(AuthError::DuplicateNickname);
            }
        }

        let hash = self.hash_blocking(plaintext).await?;
        let account = Account::new(login_key.to_string(), hash, role)
            .with_nickname(nickname.map(str::to_string));

        match self.store.create(&account) {
            Ok(()) => Ok(account),
            Err(StoreError::AlreadyExists(_)) => Err(AuthError::DuplicateIdentity),
            Err(StoreError::NicknameTaken(_)) => Err(AuthError::DuplicateNickname),
            Err(e) => Err(e.into()),
        }
    }

    /// Verify credentials and mint a token.
    ///
    /// An unknown login key, a wrong password and an unusable account all
    /// return `InvalidCredentials`; the unknown-key path still pays for one
    /// bcrypt verification.
    pub async fn login(&self, login_key: &str, plaintext: &str) -> Result<IssuedToken, AuthError> {
        let account = self.store.find_by_login_key(login_key)?;

        let verified = match &account {
            Some(account) => self.verify_blocking(plaintext, &account.credential_hash).await?,
            None => {
                let hasher = self.hasher.clone();
                let plaintext = plaintext.to_string();
                tokio::task::spawn_blocking(move || hasher.verify_decoy(&plaintext))
                    .await
                    .map_err(|e| AuthError::Internal(format!("decoy verify task: {e}")))?
            }
        };

        let account = match account {
            Some(account) if verified && account.is_usable() => account,
            Some(account) => {
                let cause = if verified { "account unusable" } else { "wrong password" };
                AuditEvent::new(AuditEventType::LoginFailed)
                    .with_target(account.id.to_string())
                    .failed(cause)
                    .emit();
                return Err(AuthError::InvalidCredentials);
            }
            None => {
                AuditEvent::new(AuditEventType::LoginFailed)
                    .failed("unknown login key")
                    .emit();
                return Err(AuthError::InvalidCredentials);
            }
        };

        let issued = self.codec.issue(
            &account.login_key,
            &[account.role],
            account.revocation_counter,
            self.token_ttl,
        )?;

        AuditEvent::new(AuditEventType::LoginSucceeded)
            .with_actor(account.id.to_string())
            .emit();
        Ok(issued)
    }

    /// Replace the caller's password after re-verifying the current one.
    ///
    /// Invalidates every outstanding token for the account, including the
    /// one used to make this call.
    pub async fn change_credential(
        &self,
        user: &AuthenticatedUser,
        current: &str,
        new: &str,
    ) -> Result<(), AuthError> {
        let account = self
            .store
            .get(user.account_id)?
            .ok_or_else(|| AuthError::rejected(RejectReason::UnknownSubject))?;

        if !self.verify_blocking(current, &account.credential_hash).await? {
            AuditEvent::new(AuditEventType::CredentialChanged)
                .with_actor(user.account_id.to_string())
                .failed("current password mismatch")
                .emit();
            return Err(AuthError::InvalidCredentials);
        }

        let credential_hash = self.hash_blocking(new).await?;
        self.mutate(
            Some(user),
            user.account_id,
            AccountMutation::ReplaceCredential { credential_hash },
        )?;
        Ok(())
    }

    pub fn change_role(
        &self,
        actor: &AuthenticatedUser,
        account_id: Uuid,
        role: Role,
    ) -> Result<Account, AuthError> {
        self.mutate(Some(actor), account_id, AccountMutation::ChangeRole(role))
    }

    pub fn disable(&self, actor: &AuthenticatedUser, account_id: Uuid) -> Result<Account, AuthError> {
        self.mutate(Some(actor), account_id, AccountMutation::Disable)
    }

    pub fn enable(&self, actor: &AuthenticatedUser, account_id: Uuid) -> Result<Account, AuthError> {
        self.mutate(Some(actor), account_id, AccountMutation::Enable)
    }

    pub fn lock(&self, actor: &AuthenticatedUser, account_id: Uuid) -> Result<Account, AuthError> {
        self.mutate(Some(actor), account_id, AccountMutation::Lock)
    }

    pub fn unlock(&self, actor: &AuthenticatedUser, account_id: Uuid) -> Result<Account, AuthError> {
        self.mutate(Some(actor), account_id, AccountMutation::Unlock)
    }

    /// Current state of the caller's own account.
    pub fn current_account(&self, user: &AuthenticatedUser) -> Result<Account, AuthError> {
        self.store
            .get(user.account_id)?
            .ok_or_else(|| AuthError::rejected(RejectReason::UnknownSubject))
    }

    pub fn list_accounts(&self) -> Result<Vec<Account>, AuthError> {
        Ok(self.store.list()?)
    }

    /// Make sure an administrator exists.
    ///
    /// Does nothing if any `Admin` account is present. Otherwise promotes the
    /// account with this login key, or creates it. Returns whether anything
    /// changed.
    pub async fn bootstrap_admin(&self, login_key: &str, plaintext: &str) -> Result<bool, AuthError> {
        if self.store.any_with_role(Role::Admin)? {
            return Ok(false);
        }

        match self.store.find_by_login_key(login_key)? {
            Some(existing) => {
                self.mutate(None, existing.id, AccountMutation::ChangeRole(Role::Admin))?;
            }
            None => {
                let account = self.create_account(login_key, plaintext, None, Role::Admin).await?;
                AuditEvent::new(AuditEventType::AccountRegistered)
                    .with_target(account.id.to_string())
                    .with_details(serde_json::json!({ "bootstrap": true }))
                    .emit();
            }
        }
        tracing::info!(login_key, "bootstrap administrator provisioned");
        Ok(true)
    }

    fn mutate(
        &self,
        actor: Option<&AuthenticatedUser>,
        account_id: Uuid,
        mutation: AccountMutation,
    ) -> Result<Account, AuthError> {
        let account = match self.store.apply(account_id, &mutation) {
            Ok(account) => account,
            Err(StoreError::NotFound(_)) => return Err(AuthError::AccountNotFound),
            Err(e) => return Err(e.into()),
        };

        let event_type = match &mutation {
            AccountMutation::ReplaceCredential { .. } => AuditEventType::CredentialChanged,
            AccountMutation::ChangeRole(_) => AuditEventType::RoleChanged,
            AccountMutation::Disable => AuditEventType::AccountDisabled,
            AccountMutation::Enable => AuditEventType::AccountEnabled,
            AccountMutation::Lock => AuditEventType::AccountLocked,
            AccountMutation::Unlock => AuditEventType::AccountUnlocked,
        };
        let mut event = AuditEvent::new(event_type)
            .with_target(account.id.to_string())
            .with_details(serde_json::json!({
                "mutation": mutation.name(),
                "role": account.role,
                "revocation_counter": account.revocation_counter,
            }));
        if let Some(actor) = actor {
            event = event.with_actor(actor.account_id.to_string());
        }
        event.emit();

        Ok(account)
    }

    async fn hash_blocking(&self, plaintext: &str) -> Result<String, AuthError> {
        let hasher = self.hasher.clone();
        let plaintext = plaintext.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
            .await
            .map_err(|e| AuthError::Internal(format!("hash task: {e}")))?
    }

    async fn verify_blocking(&self, plaintext: &str, hash: &str) -> Result<bool, AuthError> {
        let hasher = self.hasher.clone();
        let plaintext = plaintext.to_string();
        let hash = hash.to_string();
        tokio::task::spawn_blocking(move || hasher.verify(&plaintext, &hash))
            .await
            .map_err(|e| AuthError::Internal(format!("verify task: {e}")))?
    }
}
