// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{filter::authenticate, AuthenticatedUser, Role},
    models::{
        AccountResponse, AdminChangeRoleRequest, AdminUserResponse, AdminUserStatusRequest,
        AuthResponse, ChangePasswordRequest, IdentityResponse, LoginRequest, RegisterRequest,
    },
    propagation::{accept_trusted_identity, TrustPolicy},
    state::AppState,
};

pub mod account;
pub mod admin;
pub mod auth;
pub mod health;
pub mod resource;

/// Router of the authentication service.
///
/// Every route sits behind the token validation filter; public paths are
/// skipped inside the filter itself.
pub fn router(state: AppState) -> Router {
    let validator = state.validator.clone();

    let routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/csrf", post(auth::csrf))
        .route("/auth/validate", get(auth::validate))
        .route("/auth/me", get(auth::me))
        .route("/account/me", get(account::me))
        .route("/account/change-password", post(account::change_password))
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users/change-role", post(admin::change_role))
        .route("/admin/users/disable", post(admin::disable_user))
        .route("/admin/users/enable", post(admin::enable_user))
        .route("/admin/users/lock", post(admin::lock_user))
        .route("/admin/users/unlock", post(admin::unlock_user))
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state)
        .layer(middleware::from_fn_with_state(validator, authenticate));

    with_common_layers(
        routes.merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi())),
    )
}

/// Router of a resource service: identity comes from trusted headers only.
pub fn resource_router(policy: TrustPolicy) -> Router {
    let routes = Router::new()
        .route("/whoami", get(resource::whoami))
        .route("/users/{user_id}", get(resource::user_profile))
        .route("/health/live", get(health::liveness))
        .layer(middleware::from_fn_with_state(
            Arc::new(policy),
            accept_trusted_identity,
        ));

    with_common_layers(routes)
}

fn with_common_layers(router: Router) -> Router {
    // Last layer is outermost: the id is assigned, then traced, then echoed.
    router
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::register,
        auth::login,
        auth::validate,
        auth::csrf,
        auth::me,
        account::me,
        account::change_password,
        admin::list_users,
        admin::change_role,
        admin::disable_user,
        admin::enable_user,
        admin::lock_user,
        admin::unlock_user,
        health::health,
        health::liveness,
        health::readiness,
        resource::whoami,
        resource::user_profile
    ),
    components(
        schemas(
            Role,
            AuthenticatedUser,
            RegisterRequest,
            LoginRequest,
            ChangePasswordRequest,
            AuthResponse,
            AccountResponse,
            AdminUserResponse,
            AdminChangeRoleRequest,
            AdminUserStatusRequest,
            IdentityResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registration, login and token validation"),
        (name = "Account", description = "The caller's own account"),
        (name = "Admin", description = "Account administration"),
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Resource", description = "Resource-service side of identity propagation")
    )
)]
struct ApiDoc;
