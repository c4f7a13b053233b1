// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Password hashing with bcrypt.

use std::sync::Arc;

use super::AuthError;

/// Work factor used when `BCRYPT_COST` is not set.
pub const DEFAULT_BCRYPT_COST: u32 = 12;
pub const MIN_BCRYPT_COST: u32 = 4;
pub const MAX_BCRYPT_COST: u32 = 31;

/// Input hashed once at construction to produce the decoy hash.
const DECOY_PASSWORD: &str = "decoy-password-for-unknown-accounts";

/// Salted, adaptive one-way hasher.
///
/// Cheap to clone; the decoy hash is shared.
#[derive(Clone)]
pub struct PasswordHasher {
    cost: u32,
    decoy_hash: Arc<str>,
}

impl PasswordHasher {
    /// Create a hasher with the given bcrypt cost.
    ///
    /// Computes a decoy hash at the same cost, so this call takes as long as
    /// one [`hash`](Self::hash).
    pub fn new(cost: u32) -> Result<Self, AuthError> {
        let decoy = bcrypt::hash(DECOY_PASSWORD, cost)
            .map_err(|e| AuthError::Internal(format!("bcrypt decoy hash: {e}")))?;
        Ok(Self {
            cost,
            decoy_hash: decoy.into(),
        })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a plaintext password with a fresh random salt.
    pub fn hash(&self, plaintext: &str) -> Result<String, AuthError> {
        bcrypt::hash(plaintext, self.cost).map_err(|e| AuthError::Internal(format!("bcrypt hash: {e}")))
    }

    /// Verify a plaintext password against a stored hash.
    pub fn verify(&self, plaintext: &str, hash: &str) -> Result<bool, AuthError> {
        bcrypt::verify(plaintext, hash).map_err(|e| AuthError::Internal(format!("bcrypt verify: {e}")))
    }

    /// Spend the same work as a real verification, for logins whose account
    /// does not exist. Always returns `false`.
    pub fn verify_decoy(&self, plaintext: &str) -> bool {
        let _ = bcrypt::verify(plaintext, &self.decoy_hash);
        false
    }
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasher")
            .field("cost", &self.cost)
            .finish_non_exhaustive()
    }
}
