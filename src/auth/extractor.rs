// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for authenticated users.
//!
//! These read the identity the validation filter attached to the request;
//! they never parse tokens themselves. Use the `Auth` extractor in handlers
//! to require authentication:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(user): Auth) -> impl IntoResponse {
//!     // user is AuthenticatedUser
//! }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};

use super::audit::{AuditEvent, AuditEventType};
use super::error::RejectReason;
use super::{AuthError, AuthenticatedUser, Role};

/// Extractor for authenticated users.
///
/// Rejects with the same 401 as an invalid token when the request carries no
/// identity, so clients cannot tell "no token" from "bad token".
pub struct Auth(pub AuthenticatedUser);

impl<S: Send + Sync> FromRequestParts<S> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .map(Auth)
            .ok_or(AuthError::TokenRejected(RejectReason::MissingToken))
    }
}

/// Extractor requiring at least the `Moderator` role.
pub struct ModeratorOnly(pub AuthenticatedUser);

impl<S: Send + Sync> FromRequestParts<S> for ModeratorOnly {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        require_role(parts, state, Role::Moderator).await.map(ModeratorOnly)
    }
}

/// Extractor for admin-only endpoints.
pub struct AdminOnly(pub AuthenticatedUser);

impl<S: Send + Sync> FromRequestParts<S> for AdminOnly {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        require_role(parts, state, Role::Admin).await.map(AdminOnly)
    }
}

async fn require_role<S: Send + Sync>(
    parts: &mut Parts,
    state: &S,
    required: Role,
) -> Result<AuthenticatedUser, AuthError> {
    let Auth(user) = Auth::from_request_parts(parts, state).await?;

    if !user.has_role(required) {
        AuditEvent::new(AuditEventType::PermissionDenied)
            .with_actor(user.account_id.to_string())
            .with_details(serde_json::json!({
                "path": parts.uri.path(),
                "role": user.role,
                "required": required,
            }))
            .failed("insufficient role")
            .emit();
        return Err(AuthError::Forbidden);
    }

    Ok(user)
}
