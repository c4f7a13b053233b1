// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit events for security-sensitive operations.
//!
//! Registration, logins, every account mutation, token rejections and
//! permission denials are emitted on the `audit` tracing target. With
//! `LOG_FORMAT=json` each event is one JSON line that can be routed to a
//! separate sink.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Tracing target used for every audit event.
pub const AUDIT_TARGET: &str = "audit";

/// Types of auditable events.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    // Account lifecycle
    AccountRegistered,
    CredentialChanged,
    RoleChanged,
    AccountDisabled,
    AccountEnabled,
    AccountLocked,
    AccountUnlocked,

    // Auth events
    LoginSucceeded,
    LoginFailed,
    TokenRejected,
    TokenRevoked,
    PermissionDenied,
}

impl AuditEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEventType::AccountRegistered => "account_registered",
            AuditEventType::CredentialChanged => "credential_changed",
            AuditEventType::RoleChanged => "role_changed",
            AuditEventType::AccountDisabled => "account_disabled",
            AuditEventType::AccountEnabled => "account_enabled",
            AuditEventType::AccountLocked => "account_locked",
            AuditEventType::AccountUnlocked => "account_unlocked",
            AuditEventType::LoginSucceeded => "login_succeeded",
            AuditEventType::LoginFailed => "login_failed",
            AuditEventType::TokenRejected => "token_rejected",
            AuditEventType::TokenRevoked => "token_revoked",
            AuditEventType::PermissionDenied => "permission_denied",
        }
    }
}

/// An audit log entry.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    /// Unique event ID.
    pub event_id: String,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Type of event.
    pub event_type: AuditEventType,
    /// Account that performed the action (if known).
    pub actor: Option<String>,
    /// Account the action was applied to.
    pub target: Option<String>,
    /// Additional details as JSON.
    pub details: Option<serde_json::Value>,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Failure cause, for server-side eyes only.
    pub error: Option<String>,
}

impl AuditEvent {
    /// Create a new audit event.
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type,
            actor: None,
            target: None,
            details: None,
            success: true,
            error: None,
        }
    }

    /// Set the acting account.
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    /// Set the affected account.
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Add details.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Mark as failed with error message.
    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self
    }

    /// Write the event to the `audit` target.
    pub fn emit(&self) {
        let details = self
            .details
            .as_ref()
            .map(|d| d.to_string())
            .unwrap_or_default();

        if self.success {
            tracing::info!(
                target: AUDIT_TARGET,
                event_id = %self.event_id,
                event_type = self.event_type.as_str(),
                actor = self.actor.as_deref(),
                target_account = self.target.as_deref(),
                details = %details,
                "audit"
            );
        } else {
            tracing::warn!(
                target: AUDIT_TARGET,
                event_id = %self.event_id,
                event_type = self.event_type.as_str(),
                actor = self.actor.as_deref(),
                target_account = self.target.as_deref(),
                details = %details,
                error = self.error.as_deref(),
                "audit"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_fields() {
        let event = AuditEvent::new(AuditEventType::RoleChanged)
            .with_actor("admin@x.com")
            .with_target("a@x.com")
            .with_details(serde_json::json!({ "role": "MODERATOR" }));

        assert!(event.success);
        assert_eq!(event.actor.as_deref(), Some("admin@x.com"));
        assert_eq!(event.target.as_deref(), Some("a@x.com"));
        assert_eq!(event.details.as_ref().unwrap()["role"], "MODERATOR");
        assert!(!event.event_id.is_empty());
    }

    #[test]
    fn failed_records_cause() {
        let event = AuditEvent::new(AuditEventType::TokenRevoked).failed("snapshot 1 != 2");
        assert!(!event.success);
        assert_eq!(event.error.as_deref(), Some("snapshot 1 != 2"));
        // Emitting without a subscriber is a no-op.
        event.emit();
    }

    #[test]
    fn event_type_serializes_snake_case() {
        let json = serde_json::to_value(AuditEventType::LoginFailed).unwrap();
        assert_eq!(json, "login_failed");
        assert_eq!(AuditEventType::LoginFailed.as_str(), "login_failed");
    }
}
