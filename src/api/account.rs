// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    auth::Auth,
    error::ApiError,
    models::{AccountResponse, ChangePasswordRequest},
    state::AppState,
};

#[utoipa::path(
    get,
    path = "/account/me",
    tag = "Account",
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

/// Change the caller's password.
///
/// Every token issued for the account so far, including the one on this
/// request, stops working.
#[utoipa::path(
    post,
    path = "/account/change-password",
    request_body = ChangePasswordRequest,
    tag = "Account",
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Password changed; log in again"),
        (status = 400, description = "New password rejected"),
        (status = 401, description = "Unauthorized or wrong current password")
    )
)]
pub async fn change_password(
    State(state): State<AppState>,
    Auth(user): Auth,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<StatusCode, ApiError> {
    request.validate()?;
    state
        .auth
        .change_credential(&user, &request.current_password, &request.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
