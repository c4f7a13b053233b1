// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token issuance and verification (HS256 JWT).
//!
//! Verification here is the cheap, stateless half of token validation:
//! signature and expiry only. Revocation and account status need the
//! credential store and are checked by the validation filter.
//!
//! ## Expiry
//!
//! Expiry is whole seconds with zero leeway. A token is expired when
//! `exp <= now`, so a token minted with a TTL of zero (or less) is rejected
//! even when verified in the same second it was issued.

use base64ct::{Base64, Encoding};
use chrono::{DateTime, Utc};
use jsonwebtoken::{errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use super::claims::TokenClaims;
use super::roles::Role;
use super::AuthError;

/// Minimum signing key length for HS256 (256 bits).
pub const MIN_KEY_BYTES: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("signing key is not valid base64")]
    NotBase64,
    #[error("signing key is {len} bytes, at least {MIN_KEY_BYTES} are required")]
    TooShort { len: usize },
}

/// Symmetric key material for token signatures.
#[derive(Clone)]
pub struct SigningKey(Vec<u8>);

impl SigningKey {
    /// Decode a standard (padded) base64 key.
    pub fn from_base64(encoded: &str) -> Result<Self, KeyError> {
        let bytes = Base64::decode_vec(encoded.trim()).map_err(|_| KeyError::NotBase64)?;
        Self::from_bytes(bytes)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, KeyError> {
        if bytes.len() < MIN_KEY_BYTES {
            return Err(KeyError::TooShort { len: bytes.len() });
        }
        Ok(Self(bytes))
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SigningKey(<{} bytes redacted>)", self.0.len())
    }
}

/// Why [`TokenCodec::verify`] refused a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("expired")]
    Expired,
    #[error("malformed")]
    Malformed,
}

/// A freshly minted token and its validity window.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies tokens with one process-wide key.
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(key: &SigningKey) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        // Expiry is enforced in `verify_at` against an explicit clock.
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["sub", "iat", "exp"]);

        Self {
            encoding: EncodingKey::from_secret(&key.0),
            decoding: DecodingKey::from_secret(&key.0),
            validation,
        }
    }

    /// Mint a token for `subject`, valid for `ttl` from now.
    pub fn issue(
        &self,
        subject: &str,
        roles: &[Role],
        revocation_snapshot: u64,
        ttl: chrono::Duration,
    ) -> Result<IssuedToken, AuthError> {
        self.issue_at(subject, roles, revocation_snapshot, ttl, Utc::now())
    }

    pub fn issue_at(
        &self,
        subject: &str,
        roles: &[Role],
        revocation_snapshot: u64,
        ttl: chrono::Duration,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, AuthError> {
        let iat = now.timestamp();
        let exp = iat.saturating_add(ttl.num_seconds());

        let claims = TokenClaims {
            sub: subject.to_string(),
            roles: roles.to_vec(),
            ver: revocation_snapshot,
            iat,
            exp,
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Internal(format!("jwt encode: {e}")))?;

        Ok(IssuedToken {
            token,
            issued_at: timestamp(iat)?,
            expires_at: timestamp(exp)?,
        })
    }

    /// Check signature and expiry.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, TokenError> {
        self.verify_at(token, Utc::now().timestamp())
    }

    /// Check signature and expiry against the given Unix time.
    pub fn verify_at(&self, token: &str, now: i64) -> Result<TokenClaims, TokenError> {
        let data = jsonwebtoken::decode::<TokenClaims>(token, &self.decoding, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            })?;

        if data.claims.exp <= now {
            return Err(TokenError::Expired);
        }
        Ok(data.claims)
    }
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>, AuthError> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| AuthError::Internal(format!("timestamp {secs} out of range")))
}
