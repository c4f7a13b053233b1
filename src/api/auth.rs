// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credential endpoints and the front-door validation endpoint.
//!
//! `/auth/register`, `/auth/login` and `/auth/csrf` are public; the
//! validation filter skips them. `/auth/validate` is meant for the gateway's
//! sub-request and must not be exposed to clients directly.

use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap, HeaderValue, StatusCode},
    Json,
};
use uuid::Uuid;

use crate::{
    auth::Auth,
    error::ApiError,
    models::{AccountResponse, AuthResponse, LoginRequest, RegisterRequest},
    propagation::identity_headers,
    state::AppState,
};

pub const CSRF_COOKIE: &str = "XSRF-TOKEN";

#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    tag = "Auth",
    responses(
        (status = 201, description = "Account created", body = AccountResponse),
        (status = 400, description = "Validation error"),
        (status = 409, description = "Email or nickname already registered")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AccountResponse>), ApiError> {
    request.validate()?;
    let account = state
        .auth
        .register(&request.email, &request.password, request.nickname())
        .await?;
    tracing::info!(account_id = %account.id, "account registered");
    Ok((StatusCode::CREATED, Json(AccountResponse::from(&account))))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    tag = "Auth",
    responses(
        (status = 200, description = "Authentication successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let issued = state.auth.login(&request.email, &request.password).await?;
    Ok(Json(issued.into()))
}

/// Token introspection for the gateway.
///
/// Returns 200 with `X-User-Id` and `X-User-Roles` when the filter attached an
/// identity, otherwise the uniform 401.
#[utoipa::path(
    get,
    path = "/auth/validate",
    tag = "Auth",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Token is valid; identity in headers"),
        (status = 401, description = "Token is missing, invalid, expired or revoked")
    )
)]
pub async fn validate(Auth(user): Auth) -> Result<(StatusCode, HeaderMap), ApiError> {
    Ok((StatusCode::OK, identity_headers(&user)?))
}

/// CSRF bootstrap for browser clients.
///
/// Sets a random `XSRF-TOKEN` cookie readable by scripts, so the client can
/// echo it in a header on state-changing requests.
#[utoipa::path(
    post,
    path = "/auth/csrf",
    tag = "Auth",
    responses((status = 204, description = "CSRF cookie set"))
)]
pub async fn csrf() -> Result<(StatusCode, HeaderMap), ApiError> {
    let cookie = format!(
        "{CSRF_COOKIE}={}; Path=/; SameSite=Strict",
        Uuid::new_v4().simple()
    );
    let value = HeaderValue::from_str(&cookie).map_err(|_| ApiError::internal())?;

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, value);
    Ok((StatusCode::NO_CONTENT, headers))
}

#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "Auth",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Current account", body = AccountResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn me(
    State(state): State<AppState>,
    Auth(user): Auth,
) -> Result<Json<AccountResponse>, ApiError> {
    let account = state.auth.current_account(&user)?;
    Ok(Json(AccountResponse::from(&account)))
}
