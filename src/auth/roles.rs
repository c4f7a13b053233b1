// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User roles for authorization.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// User roles for authorization.
///
/// ## Role Hierarchy
///
/// Variants are declared in ascending privilege order, so the derived `Ord`
/// is the privilege order:
///
/// - `Applicant` - Prospective student, read-only access
/// - `Student` - Enrolled student, default for new registrations
/// - `Moderator` - Can moderate content and manage account status
/// - `Admin` - Full access, including role changes
///
/// The wire form is always uppercase. Parsing accepts any casing so that
/// `Moderator`, `MODERATOR` and `moderator` all name the same role.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "UPPERCASE", try_from = "String", into = "String")]
pub enum Role {
    /// Prospective student
    Applicant,
    /// Enrolled student
    Student,
    /// Content and account moderator
    Moderator,
    /// Full administrative access
    Admin,
}

/// A role name that does not belong to the closed set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role `{0}`")]
pub struct UnknownRole(pub String);

impl Role {
    pub const ALL: [Role; 4] = [Role::Applicant, Role::Student, Role::Moderator, Role::Admin];

    /// Check if this role has at least the privileges of the required role.
    pub fn has_privilege(&self, required: Role) -> bool {
        match required {
            Role::Applicant => true,
            Role::Student => matches!(self, Role::Student | Role::Moderator | Role::Admin),
            Role::Moderator => matches!(self, Role::Moderator | Role::Admin),
            Role::Admin => matches!(self, Role::Admin),
        }
    }

    /// Canonical uppercase name used in tokens and propagated headers.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Applicant => "APPLICANT",
            Role::Student => "STUDENT",
            Role::Moderator => "MODERATOR",
            Role::Admin => "ADMIN",
        }
    }

    /// Parse role from string (case-insensitive, surrounding whitespace ignored).
    pub fn parse(s: &str) -> Result<Role, UnknownRole> {
        let trimmed = s.trim();
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownRole(trimmed.to_string()))
    }
}

impl Default for Role {
    /// Default role is Student (what self-registration grants).
    fn default() -> Self {
        Role::Student
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::parse(s)
    }
}

impl TryFrom<String> for Role {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Role::parse(&value)
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}
