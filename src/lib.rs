// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Campus Auth - Token Authentication and Identity Propagation
//!
//! This crate provides the authentication service of the campus platform and
//! the resource-service side of its trusted identity header contract.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Password hashing, token codec, validation filter, extractors
//! - `propagation` - `X-User-Id` / `X-User-Roles` contract and local authorization
//! - `storage` - Credential store (redb + LRU cache)

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod propagation;
pub mod server;
pub mod state;
pub mod storage;
pub mod telemetry;
