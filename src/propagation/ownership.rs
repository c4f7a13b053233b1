// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Local ownership enforcement for resource services.
//!
//! Decisions use only the propagated [`Principal`]; a resource service never
//! calls back to the authentication service to authorize a request.

use uuid::Uuid;

use super::Principal;
use crate::auth::audit::{AuditEvent, AuditEventType};
use crate::auth::{AuthError, Role};

/// Trait for resources that have an owner.
pub trait OwnedResource {
    /// Account id of the owner.
    fn owner_id(&self) -> Uuid;
}

/// Trait for enforcing ownership on resource access.
pub trait OwnershipEnforcer {
    /// Allow the owner, or anyone holding at least `privileged`.
    ///
    /// # Errors
    /// Returns `AuthError::Forbidden` otherwise.
    fn authorize(&self, principal: &Principal, privileged: Role) -> Result<(), AuthError>;
}

impl<T: OwnedResource> OwnershipEnforcer for T {
    fn authorize(&self, principal: &Principal, privileged: Role) -> Result<(), AuthError> {
        if self.owner_id() == principal.user_id || principal.has_role(privileged) {
            return Ok(());
        }

        AuditEvent::new(AuditEventType::PermissionDenied)
            .with_actor(principal.user_id.to_string())
            .with_target(self.owner_id().to_string())
            .with_details(serde_json::json!({ "role": principal.role, "required": privileged }))
            .failed("not owner")
            .emit();
        Err(AuthError::Forbidden)
    }
}
