// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.
//!
//! Every failure the service, the validation filter and the extractors can
//! raise is an [`AuthError`]. Conversion into an HTTP response happens in
//! exactly one place, `From<AuthError> for ApiError` in `crate::error`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::codec::TokenError;
use crate::error::ApiError;
use crate::storage::StoreError;

/// Why a bearer token was refused.
///
/// Only ever logged. Clients see the same response for every variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RejectReason {
    #[error("no bearer token presented")]
    MissingToken,
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
    #[error("token is malformed")]
    Malformed,
    #[error("token subject does not resolve to an account")]
    UnknownSubject,
    #[error("account is disabled")]
    AccountDisabled,
    #[error("account is locked")]
    AccountLocked,
    #[error("token revocation snapshot {presented} does not match current counter {current}")]
    Revoked { presented: u64, current: u64 },
}

impl From<TokenError> for RejectReason {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::InvalidSignature => RejectReason::InvalidSignature,
            TokenError::Expired => RejectReason::Expired,
            TokenError::Malformed => RejectReason::Malformed,
        }
    }
}

/// Authentication error type.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Registration with a login key that is already taken
    #[error("An account with this email already exists")]
    DuplicateIdentity,
    /// Registration with a nickname another account already uses
    #[error("This nickname is already taken")]
    DuplicateNickname,
    /// Bad login or wrong current password; never says which check failed
    #[error("Invalid credentials")]
    InvalidCredentials,
    /// Administrative operation on an unknown account id
    #[error("Account not found")]
    AccountNotFound,
    /// Any token or identity check failed
    #[error("Unauthorized")]
    TokenRejected(RejectReason),
    /// Valid identity, insufficient role
    #[error("Insufficient permissions for this operation")]
    Forbidden,
    /// Request failed input validation
    #[error("{0}")]
    Validation(String),
    /// Credential store failure
    #[error("credential store failure: {0}")]
    Store(#[from] StoreError),
    /// Anything else that is not the caller's fault
    #[error("internal authentication error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::DuplicateIdentity => "duplicate_identity",
            AuthError::DuplicateNickname => "duplicate_nickname",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::AccountNotFound => "account_not_found",
            AuthError::TokenRejected(_) => "unauthorized",
            AuthError::Forbidden => "forbidden",
            AuthError::Validation(_) => "validation_failed",
            AuthError::Store(_) | AuthError::Internal(_) => "internal_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::DuplicateIdentity | AuthError::DuplicateNickname => StatusCode::CONFLICT,
            AuthError::InvalidCredentials | AuthError::TokenRejected(_) => StatusCode::UNAUTHORIZED,
            AuthError::AccountNotFound => StatusCode::NOT_FOUND,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::Store(_) | AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn rejected(reason: impl Into<RejectReason>) -> Self {
        AuthError::TokenRejected(reason.into())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(err: AuthError) -> (StatusCode, Vec<u8>) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    #[tokio::test]
    async fn every_rejection_reason_has_identical_body() {
        let reasons = [
            RejectReason::MissingToken,
            RejectReason::InvalidSignature,
            RejectReason::Expired,
            RejectReason::Malformed,
            RejectReason::UnknownSubject,
            RejectReason::AccountDisabled,
            RejectReason::AccountLocked,
            RejectReason::Revoked {
                presented: 1,
                current: 2,
            },
        ];

        let (status, expected) = body_of(AuthError::rejected(RejectReason::MissingToken)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        for reason in reasons {
            let (status, body) = body_of(AuthError::rejected(reason)).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(body, expected);
        }
    }

    #[tokio::test]
    async fn forbidden_is_distinct_from_rejection() {
        let (status, body) = body_of(AuthError::Forbidden).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error_code"], "forbidden");
    }

    #[tokio::test]
    async fn internal_errors_do_not_leak_detail() {
        let (status, body) = body_of(AuthError::Internal("bcrypt exploded".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!String::from_utf8(body).unwrap().contains("bcrypt"));
    }

    #[test]
    fn status_codes() {
        assert_eq!(AuthError::DuplicateIdentity.status_code(), StatusCode::CONFLICT);
        assert_eq!(AuthError::DuplicateNickname.status_code(), StatusCode::CONFLICT);
        assert_eq!(AuthError::InvalidCredentials.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::AccountNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AuthError::Validation("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn token_errors_map_to_reasons() {
        assert_eq!(RejectReason::from(TokenError::Expired), RejectReason::Expired);
        assert_eq!(
            RejectReason::from(TokenError::InvalidSignature),
            RejectReason::InvalidSignature
        );
        assert_eq!(RejectReason::from(TokenError::Malformed), RejectReason::Malformed);
    }
}
