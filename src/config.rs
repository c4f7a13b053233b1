// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names, default values and the
//! typed configuration built from them. Configuration is loaded once at
//! startup; any malformed value aborts the process before it binds a socket.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `SERVICE_MODE` | `auth` (token issuing front door) or `resource` | `auth` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Directory holding the account database | `./data` |
//! | `JWT_SECRET` | Base64 HS256 signing key (at least 32 bytes) | Required in `auth` mode |
//! | `TOKEN_TTL_SECONDS` | Lifetime of issued tokens | `3600` |
//! | `BCRYPT_COST` | Password hashing work factor | `12` |
//! | `ACCOUNT_CACHE_CAPACITY` | Login-key cache entries | `1024` |
//! | `ACCOUNT_CACHE_TTL_SECONDS` | Upper bound on cache staleness | `30` |
//! | `TRUSTED_PROXIES` | Comma-separated peer IPs allowed to set identity headers, or `*` to trust topology | Required in `resource` mode |
//! | `BOOTSTRAP_ADMIN_EMAIL` | Seed administrator login | Optional |
//! | `BOOTSTRAP_ADMIN_PASSWORD` | Seed administrator password | Optional |
//! | `TLS_CERT_PATH` | PEM certificate chain, enables HTTPS with `TLS_KEY_PATH` | Optional |
//! | `TLS_KEY_PATH` | PEM private key | Optional |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::auth::codec::{KeyError, SigningKey};
use crate::auth::password::{DEFAULT_BCRYPT_COST, MAX_BCRYPT_COST, MIN_BCRYPT_COST};
use crate::propagation::TrustPolicy;

pub const SERVICE_MODE_ENV: &str = "SERVICE_MODE";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Environment variable name for the account database directory.
///
/// The database file `accounts.redb` is created inside this directory.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Environment variable name for the token signing key.
///
/// Must be standard base64. There is deliberately no fallback that treats
/// the raw string as key material.
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const TOKEN_TTL_SECONDS_ENV: &str = "TOKEN_TTL_SECONDS";
pub const BCRYPT_COST_ENV: &str = "BCRYPT_COST";
pub const ACCOUNT_CACHE_CAPACITY_ENV: &str = "ACCOUNT_CACHE_CAPACITY";
pub const ACCOUNT_CACHE_TTL_SECONDS_ENV: &str = "ACCOUNT_CACHE_TTL_SECONDS";

/// Environment variable name for the trusted proxy list.
///
/// Only peers in this list may set `X-User-Id` / `X-User-Roles` on a resource
/// service. When empty, isolation relies on network topology alone.
pub const TRUSTED_PROXIES_ENV: &str = "TRUSTED_PROXIES";
pub const BOOTSTRAP_ADMIN_EMAIL_ENV: &str = "BOOTSTRAP_ADMIN_EMAIL";
pub const BOOTSTRAP_ADMIN_PASSWORD_ENV: &str = "BOOTSTRAP_ADMIN_PASSWORD";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_TOKEN_TTL_SECONDS: i64 = 3600;
const DEFAULT_CACHE_CAPACITY: usize = 1024;
const DEFAULT_CACHE_TTL_SECONDS: u64 = 30;

/// Name of the redb file inside `DATA_DIR`.
pub const ACCOUNT_DB_FILE: &str = "accounts.redb";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },

    #[error("JWT_SECRET is unusable: {0}")]
    SigningKey(#[from] KeyError),
}

/// Which side of the identity propagation boundary this process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceMode {
    /// Issues and validates tokens; the trusted front door.
    Auth,
    /// Accepts identity from trusted headers only.
    Resource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Settings shared by both service modes.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub mode: ServiceMode,
    pub bind_addr: SocketAddr,
    pub tls: Option<TlsPaths>,
    /// Who may set identity headers; only consulted in `resource` mode.
    pub trust_policy: TrustPolicy,
}

/// Settings only the authentication service needs.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub data_dir: PathBuf,
    pub signing_key: SigningKey,
    pub token_ttl: chrono::Duration,
    pub bcrypt_cost: u32,
    pub cache_capacity: usize,
    pub cache_ttl: Duration,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

#[derive(Clone)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl AuthConfig {
    /// Path of the account database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(ACCOUNT_DB_FILE)
    }
}

/// Read the log format from the environment. Unknown values fall back to pretty.
pub fn log_format() -> LogFormat {
    match std::env::var(LOG_FORMAT_ENV).ok().as_deref() {
        Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
        _ => LogFormat::Pretty,
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mode = match non_empty(&lookup, SERVICE_MODE_ENV).as_deref() {
            None | Some("auth") => ServiceMode::Auth,
            Some("resource") => ServiceMode::Resource,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: SERVICE_MODE_ENV,
                    reason: format!("expected `auth` or `resource`, got `{other}`"),
                })
            }
        };

        let host = non_empty(&lookup, HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port: u16 = parse_or(&lookup, PORT_ENV, DEFAULT_PORT)?;
        let ip: IpAddr = host.parse().map_err(|_| ConfigError::Invalid {
            var: HOST_ENV,
            reason: format!("`{host}` is not an IP address"),
        })?;

        let tls = match (
            non_empty(&lookup, TLS_CERT_PATH_ENV),
            non_empty(&lookup, TLS_KEY_PATH_ENV),
        ) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: cert.into(),
                key: key.into(),
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing(TLS_KEY_PATH_ENV)),
            (None, Some(_)) => return Err(ConfigError::Missing(TLS_CERT_PATH_ENV)),
        };

        let trust_policy = match non_empty(&lookup, TRUSTED_PROXIES_ENV).as_deref() {
            Some("*") => TrustPolicy::topology(),
            Some(list) => TrustPolicy::new(parse_ip_list(list)?),
            None => TrustPolicy::default(),
        };
        if mode == ServiceMode::Resource && trust_policy == TrustPolicy::default() {
            return Err(ConfigError::Missing(TRUSTED_PROXIES_ENV));
        }

        Ok(Self {
            mode,
            bind_addr: SocketAddr::new(ip, port),
            tls,
            trust_policy,
        })
    }
}

impl AuthConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Fails when the signing key is missing, not base64 or too short, when
    /// any numeric setting does not parse, or when the token lifetime is
    /// negative or would put expiry past the representable calendar.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = non_empty(&lookup, JWT_SECRET_ENV).ok_or(ConfigError::Missing(JWT_SECRET_ENV))?;
        let signing_key = SigningKey::from_base64(&secret)?;

        let ttl_seconds: i64 = parse_or(&lookup, TOKEN_TTL_SECONDS_ENV, DEFAULT_TOKEN_TTL_SECONDS)?;
        let token_ttl = token_ttl(ttl_seconds)?;
        let bcrypt_cost: u32 = parse_or(&lookup, BCRYPT_COST_ENV, DEFAULT_BCRYPT_COST)?;
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&bcrypt_cost) {
            return Err(ConfigError::Invalid {
                var: BCRYPT_COST_ENV,
                reason: format!("must be between {MIN_BCRYPT_COST} and {MAX_BCRYPT_COST}"),
            });
        }

        let cache_capacity = parse_or(&lookup, ACCOUNT_CACHE_CAPACITY_ENV, DEFAULT_CACHE_CAPACITY)?;
        let cache_ttl_seconds =
            parse_or(&lookup, ACCOUNT_CACHE_TTL_SECONDS_ENV, DEFAULT_CACHE_TTL_SECONDS)?;

        let bootstrap_admin = match (
            non_empty(&lookup, BOOTSTRAP_ADMIN_EMAIL_ENV),
            non_empty(&lookup, BOOTSTRAP_ADMIN_PASSWORD_ENV),
        ) {
            (Some(email), Some(password)) => Some(BootstrapAdmin { email, password }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing(BOOTSTRAP_ADMIN_PASSWORD_ENV)),
            (None, Some(_)) => return Err(ConfigError::Missing(BOOTSTRAP_ADMIN_EMAIL_ENV)),
        };

        Ok(Self {
            data_dir: non_empty(&lookup, DATA_DIR_ENV)
                .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string())
                .into(),
            signing_key,
            token_ttl,
            bcrypt_cost,
            cache_capacity,
            cache_ttl: Duration::from_secs(cache_ttl_seconds),
            bootstrap_admin,
        })
    }
}

/// Token lifetime, checked so that issuing a token can never overflow.
fn token_ttl(seconds: i64) -> Result<chrono::Duration, ConfigError> {
    let invalid = |reason: &str| ConfigError::Invalid {
        var: TOKEN_TTL_SECONDS_ENV,
        reason: reason.to_string(),
    };
    if seconds < 0 {
        return Err(invalid("must not be negative"));
    }
    let ttl = chrono::Duration::try_seconds(seconds).ok_or_else(|| invalid("out of range"))?;
    chrono::Utc::now()
        .checked_add_signed(ttl)
        .ok_or_else(|| invalid("expiry would be past the maximum timestamp"))?;
    Ok(ttl)
}

fn non_empty<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty(lookup, name) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            var: name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn parse_ip_list(list: &str) -> Result<Vec<IpAddr>, ConfigError> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse().map_err(|_| ConfigError::Invalid {
                var: TRUSTED_PROXIES_ENV,
                reason: format!("`{s}` is not an IP address"),
            })
        })
        .collect()
}
