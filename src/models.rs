// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies of the REST API. Field names are camelCase on
//! the wire; every type derives `ToSchema` for the OpenAPI document.
//!
//! Request types that carry a password deliberately do not derive `Debug`.
//!
//! ## Model Categories
//!
//! - **Credentials**: registration, login, password change
//! - **Accounts**: the caller's own account and the moderator view
//! - **Identity**: what a resource service learned from propagated headers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{AuthError, IssuedToken, Role};
use crate::propagation::Principal;
use crate::storage::Account;

/// Shortest password accepted on registration or change.
pub const MIN_PASSWORD_CHARS: usize = 8;

/// bcrypt only reads the first 72 bytes of its input.
pub const MAX_PASSWORD_BYTES: usize = 72;

pub const MAX_NICKNAME_CHARS: usize = 32;

// =============================================================================
// Validation
// =============================================================================

/// Minimal email shape check: one `@`, non-empty local part and domain, no
/// whitespace.
pub fn validate_email(email: &str) -> Result<(), AuthError> {
    let well_formed = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if well_formed {
        Ok(())
    } else {
        Err(AuthError::Validation("email is not well-formed".into()))
    }
}

pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(AuthError::Validation(format!(
            "password must be at least {MIN_PASSWORD_CHARS} characters"
        )));
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(AuthError::Validation(format!(
            "password must be at most {MAX_PASSWORD_BYTES} bytes"
        )));
    }
    Ok(())
}

/// Nicknames are shown to other users, so they may not carry control
/// characters. Length is counted after trimming.
pub fn validate_nickname(nickname: &str) -> Result<(), AuthError> {
    if nickname.chars().count() > MAX_NICKNAME_CHARS {
        return Err(AuthError::Validation(format!(
            "nickname must be at most {MAX_NICKNAME_CHARS} characters"
        )));
    }
    if nickname.chars().any(char::is_control) {
        return Err(AuthError::Validation(
            "nickname must not contain control characters".into(),
        ));
    }
    Ok(())
}

// =============================================================================
// Credentials
// =============================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    /// Login key; case-sensitive.
    #[schema(example = "a@x.com")]
    pub email: String,
    pub password: String,
    /// Optional public display name, unique across accounts.
    #[serde(default)]
    #[schema(example = "johnny")]
    pub nickname: Option<String>,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), AuthError> {
        validate_email(&self.email)?;
        validate_password(&self.password)?;
        match self.nickname() {
            Some(nickname) => validate_nickname(nickname),
            None => Ok(()),
        }
    }

    /// Trimmed nickname; a blank one counts as absent.
    pub fn nickname(&self) -> Option<&str> {
        self.nickname
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
    }
}

/// Login is not shape-checked: a malformed email simply fails as invalid
/// credentials.
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

impl ChangePasswordRequest {
    pub fn validate(&self) -> Result<(), AuthError> {
        validate_password(&self.new_password)
    }
}

/// Issued bearer token.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    /// Always `Bearer`.
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
}

impl From<IssuedToken> for AuthResponse {
    fn from(issued: IssuedToken) -> Self {
        Self {
            token: issued.token,
            token_type: "Bearer".to_string(),
            expires_at: issued.expires_at,
        }
    }
}

// =============================================================================
// Accounts
// =============================================================================

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub id: Uuid,
    pub email: String,
    pub nickname: Option<String>,
    pub role: Role,
}

impl From<&Account> for AccountResponse {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            email: account.login_key.clone(),
            nickname: account.nickname.clone(),
            role: account.role,
        }
    }
}

/// Account as listed for moderators and administrators.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserResponse {
    pub id: Uuid,
    pub email: String,
    pub nickname: Option<String>,
    pub role: Role,
    pub enabled: bool,
    pub locked: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Account> for AdminUserResponse {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            email: account.login_key.clone(),
            nickname: account.nickname.clone(),
            role: account.role,
            enabled: account.enabled,
            locked: account.locked,
            created_at: account.created_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminChangeRoleRequest {
    pub user_id: Uuid,
    pub role: Role,
}

/// Target of a disable, enable, lock or unlock call.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserStatusRequest {
    pub user_id: Uuid,
}

// =============================================================================
// Identity
// =============================================================================

/// Identity a resource service received through the propagation headers.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IdentityResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

impl From<Option<&Principal>> for IdentityResponse {
    fn from(principal: Option<&Principal>) -> Self {
        Self {
            authenticated: principal.is_some(),
            user_id: principal.map(|p| p.user_id),
            role: principal.map(|p| p.role),
        }
    }
}
