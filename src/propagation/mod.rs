// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Identity Propagation
//!
//! The contract between the authentication service and resource services.
//!
//! The front door validates the bearer token and hands the verified identity
//! downstream in two headers:
//!
//! | Header | Value |
//! |--------|-------|
//! | `X-User-Id` | account UUID |
//! | `X-User-Roles` | exactly one role, canonical uppercase |
//!
//! Resource services never see or re-validate tokens. They accept these
//! headers only from peers their [`TrustPolicy`] allows and evaluate role and
//! ownership rules locally.

pub mod identity;
pub mod ownership;

use axum::http::{HeaderMap, HeaderName, HeaderValue};

use crate::auth::{AuthError, AuthenticatedUser};

pub use identity::{
    accept_trusted_identity, identity_from_headers, Identity, Principal, RequestIdentity,
    RequirePrincipal, TrustPolicy,
};
pub use ownership::{OwnedResource, OwnershipEnforcer};

pub const USER_ID_HEADER: HeaderName = HeaderName::from_static("x-user-id");
pub const USER_ROLE_HEADER: HeaderName = HeaderName::from_static("x-user-roles");

/// Build the identity headers for a verified user.
pub fn identity_headers(user: &AuthenticatedUser) -> Result<HeaderMap, AuthError> {
    let id = HeaderValue::from_str(&user.account_id.to_string())
        .map_err(|e| AuthError::Internal(format!("user id header: {e}")))?;

    let mut headers = HeaderMap::with_capacity(2);
    headers.insert(USER_ID_HEADER, id);
    headers.insert(USER_ROLE_HEADER, HeaderValue::from_static(user.role.as_str()));
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use uuid::Uuid;

    #[test]
    fn headers_carry_id_and_single_uppercase_role() {
        let user = AuthenticatedUser {
            account_id: Uuid::new_v4(),
            subject: "a@x.com".into(),
            role: Role::Moderator,
        };
        let headers = identity_headers(&user).unwrap();

        assert_eq!(headers.get(USER_ID_HEADER).unwrap(), &user.account_id.to_string());
        assert_eq!(headers.get(USER_ROLE_HEADER).unwrap(), "MODERATOR");
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn emitted_headers_round_trip_through_the_consumer() {
        let user = AuthenticatedUser {
            account_id: Uuid::new_v4(),
            subject: "a@x.com".into(),
            role: Role::Applicant,
        };
        let identity = identity_from_headers(&identity_headers(&user).unwrap());

        assert_eq!(
            identity,
            RequestIdentity::Authenticated(Principal {
                user_id: user.account_id,
                role: Role::Applicant,
            })
        );
    }
}
