// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Credential verification, token issuance and per-request token validation
//! for the authentication service.
//!
//! ## Auth Flow
//!
//! 1. Client posts email and password to `/auth/login`
//! 2. [`AuthService`] verifies the bcrypt hash and mints an HS256 JWT with:
//!    - `sub` → login key
//!    - `roles` → role snapshot
//!    - `ver` → the account's revocation counter
//! 3. Client sends `Authorization: Bearer <token>` on later requests
//! 4. The [`filter::authenticate`] middleware:
//!    - Verifies signature and expiry
//!    - Re-loads the account (cache first)
//!    - Requires enabled, not locked, and `ver == revocation_counter`
//!    - Attaches an [`AuthenticatedUser`] to the request
//! 5. Handlers pull the identity with [`Auth`], [`ModeratorOnly`] or [`AdminOnly`]
//!
//! ## Security
//!
//! - Any account mutation bumps the revocation counter, revoking every token
//!   issued before it
//! - No clock skew tolerance: a token is dead at `exp`
//! - All token failures return one identical 401; causes go to the logs

pub mod audit;
pub mod claims;
pub mod codec;
pub mod error;
pub mod extractor;
pub mod filter;
pub mod password;
pub mod roles;
pub mod service;

pub use claims::{AuthenticatedUser, TokenClaims};
pub use codec::{IssuedToken, SigningKey, TokenCodec};
pub use error::AuthError;
pub use extractor::{AdminOnly, Auth, ModeratorOnly};
pub use filter::TokenValidator;
pub use password::PasswordHasher;
pub use roles::Role;
pub use service::AuthService;
