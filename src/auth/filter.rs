// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token validation middleware for Axum.
//!
//! Runs once per request in front of every route of the authentication
//! service. The decision sequence short-circuits:
//!
//! 1. Public paths (credential submission, CSRF bootstrap) are skipped.
//! 2. No `Authorization: Bearer` header: continue unauthenticated and let the
//!    handler's extractor decide.
//! 3. An [`AuthenticatedUser`] is already attached: continue unchanged.
//! 4. Signature and expiry via [`TokenCodec::verify`].
//! 5. The subject must resolve to an account.
//! 6. The account must be enabled and not locked.
//! 7. The token's revocation snapshot must equal the current counter.
//! 8. Attach a fresh [`AuthenticatedUser`] with the *current* role.
//!
//! Steps 4 to 7 fail with the same client-visible 401. The cause is logged
//! and a revocation mismatch is additionally recorded as an audit event.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let app = Router::new()
//!     .route("/account/me", get(me))
//!     .layer(axum::middleware::from_fn_with_state(validator, authenticate));
//! ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;

use super::audit::{AuditEvent, AuditEventType};
use super::codec::TokenCodec;
use super::error::RejectReason;
use super::{AuthError, AuthenticatedUser};
use crate::storage::CredentialStore;

/// Paths the filter never inspects.
pub const PUBLIC_PATHS: [&str; 3] = ["/auth/login", "/auth/register", "/auth/csrf"];

const BEARER_PREFIX: &str = "Bearer ";

pub fn is_public_path(path: &str) -> bool {
    PUBLIC_PATHS.contains(&path)
}

/// Extract the token from an `Authorization: Bearer <token>` header.
///
/// Other schemes and non-ASCII header values count as "no bearer token".
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix(BEARER_PREFIX)
        .map(str::trim)
}

/// Steps 4 to 7 of the decision sequence, independent of HTTP.
pub struct TokenValidator {
    codec: Arc<TokenCodec>,
    store: Arc<CredentialStore>,
}

impl TokenValidator {
    pub fn new(codec: Arc<TokenCodec>, store: Arc<CredentialStore>) -> Self {
        Self { codec, store }
    }

    /// Validate a bearer token against the signature, the clock and the
    /// current account state.
    ///
    /// # Errors
    ///
    /// `TokenRejected` for any failed check; `Store` if the credential store
    /// itself fails.
    pub fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        self.validate_at(token, Utc::now().timestamp())
    }

    pub fn validate_at(&self, token: &str, now: i64) -> Result<AuthenticatedUser, AuthError> {
        let claims = self
            .codec
            .verify_at(token, now)
            .map_err(|e| reject(RejectReason::from(e), None))?;

        let account = self
            .store
            .resolve_subject(claims.subject())?
            .ok_or_else(|| reject(RejectReason::UnknownSubject, None))?;

        let target = Some(account.id.to_string());
        if !account.enabled {
            return Err(reject(RejectReason::AccountDisabled, target));
        }
        if account.locked {
            return Err(reject(RejectReason::AccountLocked, target));
        }

        if claims.revocation_snapshot() != account.revocation_counter {
            let reason = RejectReason::Revoked {
                presented: claims.revocation_snapshot(),
                current: account.revocation_counter,
            };
            AuditEvent::new(AuditEventType::TokenRevoked)
                .with_target(account.id.to_string())
                .failed(reason.to_string())
                .emit();
            return Err(AuthError::TokenRejected(reason));
        }

        Ok(AuthenticatedUser::from_account(&account))
    }
}

fn reject(reason: RejectReason, target: Option<String>) -> AuthError {
    let mut event = AuditEvent::new(AuditEventType::TokenRejected).failed(reason.to_string());
    if let Some(target) = target {
        event = event.with_target(target);
    }
    event.emit();
    AuthError::TokenRejected(reason)
}

/// Authentication middleware function.
pub async fn authenticate(
    State(validator): State<Arc<TokenValidator>>,
    mut request: Request,
    next: Next,
) -> Response {
    if is_public_path(request.uri().path()) {
        return next.run(request).await;
    }

    let Some(token) = bearer_token(request.headers()) else {
        return next.run(request).await;
    };

    if request.extensions().get::<AuthenticatedUser>().is_some() {
        return next.run(request).await;
    }

    match validator.validate(token) {
        Ok(user) => {
            tracing::debug!(account_id = %user.account_id, role = %user.role, "token accepted");
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(err) => err.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::codec::SigningKey;
    use crate::auth::Role;
    use crate::storage::{Account, AccountMutation};
    use axum::{body::Body, http::StatusCode, middleware, routing::get, Extension, Router};
    use std::time::Duration;
    use tower::ServiceExt;

    struct Fixture {
        _dir: tempfile::TempDir,
        codec: Arc<TokenCodec>,
        store: Arc<CredentialStore>,
        validator: Arc<TokenValidator>,
        account: Account,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(
            CredentialStore::open(&dir.path().join("a.redb"), 16, Duration::from_secs(60)).unwrap(),
        );
        let codec = Arc::new(TokenCodec::new(&SigningKey::from_bytes(vec![3; 32]).unwrap()));
        let account = Account::new("a@x.com".into(), "hash".into(), Role::Student);
        store.create(&account).unwrap();
        let validator = Arc::new(TokenValidator::new(codec.clone(), store.clone()));
        Fixture {
            _dir: dir,
            codec,
            store,
            validator,
            account,
        }
    }

    impl Fixture {
        fn token(&self, ver: u64) -> String {
            self.codec
                .issue("a@x.com", &[Role::Student], ver, chrono::Duration::hours(1))
                .unwrap()
                .token
        }
    }

    fn reason(err: AuthError) -> RejectReason {
        match err {
            AuthError::TokenRejected(reason) => reason,
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, "Bearer abc.def.ghi".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));
    }

    #[test]
    fn public_paths() {
        assert!(is_public_path("/auth/login"));
        assert!(is_public_path("/auth/register"));
        assert!(is_public_path("/auth/csrf"));
        assert!(!is_public_path("/auth/validate"));
        assert!(!is_public_path("/account/me"));
    }

    #[test]
    fn valid_token_resolves_current_identity() {
        let f = fixture();
        let user = f.validator.validate(&f.token(0)).unwrap();
        assert_eq!(user.account_id, f.account.id);
        assert_eq!(user.subject, "a@x.com");
        assert_eq!(user.role, Role::Student);
    }

    #[test]
    fn role_comes_from_account_not_claim() {
        let f = fixture();
        let token = f.token(0);
        f.store
            .apply(f.account.id, &AccountMutation::ChangeRole(Role::Moderator))
            .unwrap();
        assert!(f.validator.validate(&token).is_err());

        // Still claims STUDENT, but carries the new counter.
        let user = f.validator.validate(&f.token(1)).unwrap();
        assert_eq!(user.role, Role::Moderator);
    }

    #[test]
    fn rejects_each_failure_with_distinct_logged_reason() {
        let f = fixture();

        assert_eq!(reason(f.validator.validate("garbage").unwrap_err()), RejectReason::Malformed);

        let now = Utc::now().timestamp();
        assert_eq!(
            reason(f.validator.validate_at(&f.token(0), now + 7200).unwrap_err()),
            RejectReason::Expired
        );

        let ghost = f
            .codec
            .issue("ghost@x.com", &[Role::Admin], 0, chrono::Duration::hours(1))
            .unwrap();
        assert_eq!(
            reason(f.validator.validate(&ghost.token).unwrap_err()),
            RejectReason::UnknownSubject
        );

        assert_eq!(
            reason(f.validator.validate(&f.token(5)).unwrap_err()),
            RejectReason::Revoked {
                presented: 5,
                current: 0
            }
        );

        f.store.apply(f.account.id, &AccountMutation::Disable).unwrap();
        assert_eq!(
            reason(f.validator.validate(&f.token(1)).unwrap_err()),
            RejectReason::AccountDisabled
        );

        f.store.apply(f.account.id, &AccountMutation::Enable).unwrap();
        f.store.apply(f.account.id, &AccountMutation::Lock).unwrap();
        assert_eq!(
            reason(f.validator.validate(&f.token(3)).unwrap_err()),
            RejectReason::AccountLocked
        );
    }

    #[test]
    fn snapshot_match_is_exact() {
        let f = fixture();
        f.store.apply(f.account.id, &AccountMutation::Unlock).unwrap();
        // Counter is now 1: both older and newer snapshots fail.
        assert!(f.validator.validate(&f.token(0)).is_err());
        assert!(f.validator.validate(&f.token(2)).is_err());
        assert!(f.validator.validate(&f.token(1)).is_ok());
    }

    async fn whoami(user: Option<Extension<AuthenticatedUser>>) -> String {
        match user {
            Some(Extension(user)) => user.subject,
            None => "anonymous".to_string(),
        }
    }

    fn app(validator: Arc<TokenValidator>) -> Router {
        Router::new()
            .route("/whoami", get(whoami))
            .route("/auth/login", get(whoami))
            .layer(middleware::from_fn_with_state(validator, authenticate))
    }

    async fn call(app: Router, path: &str, token: Option<&str>) -> (StatusCode, String) {
        let mut builder = axum::http::Request::builder().uri(path);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let response = app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn middleware_attaches_identity() {
        let f = fixture();
        let (status, body) = call(app(f.validator.clone()), "/whoami", Some(&f.token(0))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "a@x.com");
    }

    #[tokio::test]
    async fn middleware_passes_anonymous_requests_through() {
        let f = fixture();
        let (status, body) = call(app(f.validator.clone()), "/whoami", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "anonymous");
    }

    #[tokio::test]
    async fn middleware_skips_public_paths_even_with_bad_token() {
        let f = fixture();
        let (status, body) = call(app(f.validator.clone()), "/auth/login", Some("garbage")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "anonymous");
    }

    #[tokio::test]
    async fn middleware_rejections_are_identical() {
        let f = fixture();
        let expired = f
            .codec
            .issue("a@x.com", &[Role::Student], 0, chrono::Duration::zero())
            .unwrap()
            .token;

        let (s1, b1) = call(app(f.validator.clone()), "/whoami", Some("garbage")).await;
        let (s2, b2) = call(app(f.validator.clone()), "/whoami", Some(&expired)).await;
        let (s3, b3) = call(app(f.validator.clone()), "/whoami", Some(&f.token(9))).await;

        assert_eq!(s1, StatusCode::UNAUTHORIZED);
        assert_eq!((s1, &b1), (s2, &b2));
        assert_eq!((s1, &b1), (s3, &b3));
    }

    #[tokio::test]
    async fn already_authenticated_request_is_not_revalidated() {
        let f = fixture();
        let preset = AuthenticatedUser::from_account(&f.account);
        let app = app(f.validator.clone());

        let mut request = axum::http::Request::builder()
            .uri("/whoami")
            .header(AUTHORIZATION, "Bearer garbage")
            .body(Body::empty())
            .unwrap();
        request.extensions_mut().insert(preset);

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
