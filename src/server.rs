// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Process startup: pick the service mode, build the router and serve it over
//! HTTP or HTTPS until Ctrl-C.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use axum_server::{tls_rustls::RustlsConfig, Handle};

use crate::api;
use crate::auth::AuthError;
use crate::config::{AuthConfig, ConfigError, ServerConfig, ServiceMode};
use crate::state::AppState;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("startup failed: {0}")]
    Startup(#[from] AuthError),

    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Run the service described by `config`.
pub async fn run(config: ServerConfig) -> Result<(), ServerError> {
    let app = match config.mode {
        ServiceMode::Auth => auth_service().await?,
        ServiceMode::Resource => {
            let policy = config.trust_policy.clone();
            if policy.delegates_to_topology() {
                tracing::warn!(
                    "TRUSTED_PROXIES=*: identity headers are accepted from any peer"
                );
            }
            api::resource_router(policy)
        }
    };

    serve(app, &config, ctrl_c()).await
}

async fn auth_service() -> Result<Router, ServerError> {
    let auth_config = AuthConfig::from_env()?;
    let state = AppState::from_config(&auth_config)?;

    if let Some(admin) = &auth_config.bootstrap_admin {
        state.auth.bootstrap_admin(&admin.email, &admin.password).await?;
    }

    tracing::info!(
        database = %auth_config.database_path().display(),
        token_ttl_seconds = auth_config.token_ttl.num_seconds(),
        bcrypt_cost = auth_config.bcrypt_cost,
        "authentication service ready"
    );
    Ok(api::router(state))
}

/// Serve `app` until `shutdown` resolves, then drain connections.
async fn serve<F>(app: Router, config: &ServerConfig, shutdown: F) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let service = app.into_make_service_with_connect_info::<SocketAddr>();

    let handle: Handle<SocketAddr> = Handle::new();
    tokio::spawn(graceful_shutdown_on(shutdown, handle.clone()));

    match &config.tls {
        Some(tls) => {
            // Fails only if a provider is already installed, which is fine.
            let _ = rustls::crypto::ring::default_provider().install_default();
            let tls_config = RustlsConfig::from_pem_file(&tls.cert, &tls.key).await?;

            tracing::info!(addr = %config.bind_addr, mode = ?config.mode, "listening on https (docs at /docs)");
            axum_server::bind_rustls(config.bind_addr, tls_config)
                .handle(handle)
                .serve(service)
                .await?;
        }
        None => {
            tracing::info!(addr = %config.bind_addr, mode = ?config.mode, "listening on http (docs at /docs)");
            axum_server::bind(config.bind_addr)
                .handle(handle)
                .serve(service)
                .await?;
        }
    }

    tracing::info!("server stopped");
    Ok(())
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

async fn graceful_shutdown_on<F>(signal: F, handle: Handle<SocketAddr>)
where
    F: Future<Output = ()>,
{
    signal.await;
    tracing::info!("shutdown requested");
    handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
}
