// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and authenticated user representation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::roles::Role;
use crate::storage::Account;

/// Claims carried by every issued token.
///
/// Field names are kept short because the whole set travels on every request.
/// `roles` is a snapshot taken at login and may be stale; authorization uses
/// the role re-loaded by the validation filter instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: the account's login key (email)
    pub sub: String,

    /// Role snapshot at issuance (always exactly one entry when minted here)
    pub roles: Vec<Role>,

    /// Revocation counter snapshot at issuance
    pub ver: u64,

    /// Issued at (Unix seconds)
    pub iat: i64,

    /// Expiration (Unix seconds)
    pub exp: i64,
}

impl TokenClaims {
    pub fn subject(&self) -> &str {
        &self.sub
    }

    pub fn revocation_snapshot(&self) -> u64 {
        self.ver
    }

    pub fn role_claims(&self) -> &[Role] {
        &self.roles
    }
}

/// Authenticated user information resolved by the validation filter.
///
/// A fresh value is built for each request and stored in that request's
/// extensions; it is never cached or shared between requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    /// Stable account id
    pub account_id: Uuid,

    /// Login key the token was issued for
    pub subject: String,

    /// Current role, re-read from the credential store
    pub role: Role,
}

impl AuthenticatedUser {
    /// Build from the current state of an account.
    pub fn from_account(account: &Account) -> Self {
        Self {
            account_id: account.id,
            subject: account.login_key.clone(),
            role: account.role,
        }
    }

    /// Check if the user has the required role.
    pub fn has_role(&self, required: Role) -> bool {
        self.role.has_privilege(required)
    }

    /// Check if this user is an admin.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_account(role: Role) -> Account {
        Account::new("ada@campus.test".into(), "$2b$04$hash".into(), role)
    }

    #[test]
    fn projections_return_claim_fields() {
        let claims = TokenClaims {
            sub: "ada@campus.test".into(),
            roles: vec![Role::Student],
            ver: 7,
            iat: 1_700_000_000,
            exp: 1_700_003_600,
        };
        assert_eq!(claims.subject(), "ada@campus.test");
        assert_eq!(claims.revocation_snapshot(), 7);
        assert_eq!(claims.role_claims(), &[Role::Student]);
    }

    #[test]
    fn claims_accept_lowercase_roles() {
        let json = r#"{"sub":"a@x.com","roles":["moderator"],"ver":0,"iat":1,"exp":2}"#;
        let claims: TokenClaims = serde_json::from_str(json).unwrap();
        assert_eq!(claims.roles, vec![Role::Moderator]);
    }

    #[test]
    fn from_account_copies_identity() {
        let account = sample_account(Role::Moderator);
        let user = AuthenticatedUser::from_account(&account);
        assert_eq!(user.account_id, account.id);
        assert_eq!(user.subject, "ada@campus.test");
        assert_eq!(user.role, Role::Moderator);
    }

    #[test]
    fn has_role_checks_privilege() {
        let moderator = AuthenticatedUser::from_account(&sample_account(Role::Moderator));
        assert!(moderator.has_role(Role::Student));
        assert!(moderator.has_role(Role::Moderator));
        assert!(!moderator.has_role(Role::Admin));
        assert!(!moderator.is_admin());

        let admin = AuthenticatedUser::from_account(&sample_account(Role::Admin));
        assert!(admin.is_admin());
    }
}
