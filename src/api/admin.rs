// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account administration endpoints.
//!
//! Moderators can list accounts and toggle their status; only administrators
//! can change roles. Every state change revokes the target's outstanding
//! tokens.

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    auth::{AdminOnly, ModeratorOnly},
    error::ApiError,
    models::{AdminChangeRoleRequest, AdminUserResponse, AdminUserStatusRequest},
    state::AppState,
};

#[utoipa::path(
    get,
    path = "/admin/users",
    tag = "Admin",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "All accounts, oldest first", body = [AdminUserResponse]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Moderator role required")
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    ModeratorOnly(_user): ModeratorOnly,
) -> Result<Json<Vec<AdminUserResponse>>, ApiError> {
    let accounts = state.auth.list_accounts()?;
    Ok(Json(accounts.iter().map(AdminUserResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/admin/users/change-role",
    request_body = AdminChangeRoleRequest,
    tag = "Admin",
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Role changed"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Account not found")
    )
)]
pub async fn change_role(
    State(state): State<AppState>,
    AdminOnly(admin): AdminOnly,
    Json(request): Json<AdminChangeRoleRequest>,
) -> Result<StatusCode, ApiError> {
    state.auth.change_role(&admin, request.user_id, request.role)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/admin/users/disable",
    request_body = AdminUserStatusRequest,
    tag = "Admin",
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Account disabled"),
        (status = 403, description = "Moderator role required"),
        (status = 404, description = "Account not found")
    )
)]
pub async fn disable_user(
    State(state): State<AppState>,
    ModeratorOnly(moderator): ModeratorOnly,
    Json(request): Json<AdminUserStatusRequest>,
) -> Result<StatusCode, ApiError> {
    state.auth.disable(&moderator, request.user_id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/admin/users/enable",
    request_body = AdminUserStatusRequest,
    tag = "Admin",
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Account enabled"),
        (status = 403, description = "Moderator role required"),
        (status = 404, description = "Account not found")
    )
)]
pub async fn enable_user(
    State(state): State<AppState>,
    ModeratorOnly(moderator): ModeratorOnly,
    Json(request): Json<AdminUserStatusRequest>,
) -> Result<StatusCode, ApiError> {
    state.auth.enable(&moderator, request.user_id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/admin/users/lock",
    request_body = AdminUserStatusRequest,
    tag = "Admin",
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Account locked"),
        (status = 403, description = "Moderator role required"),
        (status = 404, description = "Account not found")
    )
)]
pub async fn lock_user(
    State(state): State<AppState>,
    ModeratorOnly(moderator): ModeratorOnly,
    Json(request): Json<AdminUserStatusRequest>,
) -> Result<StatusCode, ApiError> {
    state.auth.lock(&moderator, request.user_id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/admin/users/unlock",
    request_body = AdminUserStatusRequest,
    tag = "Admin",
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Account unlocked"),
        (status = 403, description = "Moderator role required"),
        (status = 404, description = "Account not found")
    )
)]
pub async fn unlock_user(
    State(state): State<AppState>,
    ModeratorOnly(moderator): ModeratorOnly,
    Json(request): Json<AdminUserStatusRequest>,
) -> Result<StatusCode, ApiError> {
    state.auth.unlock(&moderator, request.user_id)?;
    Ok(StatusCode::NO_CONTENT)
}
