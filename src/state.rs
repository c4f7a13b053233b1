// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::{AuthError, AuthService, PasswordHasher, TokenCodec, TokenValidator};
use crate::config::AuthConfig;
use crate::storage::CredentialStore;

/// Shared state of the authentication service.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub validator: Arc<TokenValidator>,
    pub store: Arc<CredentialStore>,
}

impl AppState {
    /// Wire every component from one store and one codec so that the service
    /// and the filter agree on the key and see the same cache.
    pub fn new(
        store: Arc<CredentialStore>,
        codec: Arc<TokenCodec>,
        hasher: PasswordHasher,
        token_ttl: chrono::Duration,
    ) -> Self {
        let validator = Arc::new(TokenValidator::new(codec.clone(), store.clone()));
        let auth = Arc::new(AuthService::new(store.clone(), hasher, codec, token_ttl));
        Self {
            auth,
            validator,
            store,
        }
    }

    /// Open the account database and build the service from configuration.
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        std::fs::create_dir_all(&config.data_dir)
            .map_err(|e| AuthError::Internal(format!("create {}: {e}", config.data_dir.display())))?;

        let store = Arc::new(CredentialStore::open(
            &config.database_path(),
            config.cache_capacity,
            config.cache_ttl,
        )?);
        let codec = Arc::new(TokenCodec::new(&config.signing_key));
        let hasher = PasswordHasher::new(config.bcrypt_cost)?;

        Ok(Self::new(store, codec, hasher, config.token_ttl))
    }
}
