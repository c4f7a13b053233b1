// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Resource-service endpoints.
//!
//! These only ever see identity through [`accept_trusted_identity`]; there is
//! no token handling on this side of the gateway.
//!
//! [`accept_trusted_identity`]: crate::propagation::accept_trusted_identity

use axum::{extract::Path, Json};
use uuid::Uuid;

use crate::{
    auth::Role,
    error::ApiError,
    models::IdentityResponse,
    propagation::{Identity, OwnedResource, OwnershipEnforcer, RequirePrincipal},
};

/// Echo the propagated identity, or report the caller as anonymous.
#[utoipa::path(
    get,
    path = "/whoami",
    tag = "Resource",
    responses((status = 200, description = "Identity seen by this service", body = IdentityResponse))
)]
pub async fn whoami(Identity(identity): Identity) -> Json<IdentityResponse> {
    Json(IdentityResponse::from(identity.principal()))
}

/// A user's own profile scope inside a resource service.
struct ProfileScope {
    user_id: Uuid,
}

impl OwnedResource for ProfileScope {
    fn owner_id(&self) -> Uuid {
        self.user_id
    }
}

/// Identity view of one user: visible to that user and to moderators.
#[utoipa::path(
    get,
    path = "/users/{user_id}",
    params(("user_id" = Uuid, Path, description = "Account id of the profile owner")),
    tag = "Resource",
    responses(
        (status = 200, description = "Caller may view this user", body = IdentityResponse),
        (status = 401, description = "No propagated identity"),
        (status = 403, description = "Neither owner nor moderator")
    )
)]
pub async fn user_profile(
    RequirePrincipal(principal): RequirePrincipal,
    Path(user_id): Path<Uuid>,
) -> Result<Json<IdentityResponse>, ApiError> {
    ProfileScope { user_id }.authorize(&principal, Role::Moderator)?;
    Ok(Json(IdentityResponse::from(Some(&principal))))
}
