// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Resource-service side of the identity header contract.

use std::net::SocketAddr;

use axum::{
    body::{to_bytes, Body},
    extract::ConnectInfo,
    http::{Request, StatusCode},
};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use campus_auth::api::resource_router;
use campus_auth::propagation::{TrustPolicy, USER_ID_HEADER, USER_ROLE_HEADER};

const GATEWAY: &str = "10.1.0.1";

fn gateway_policy() -> TrustPolicy {
    TrustPolicy::new(vec![GATEWAY.parse().unwrap()])
}

async fn call(
    policy: TrustPolicy,
    path: &str,
    peer: &str,
    identity: Option<(Uuid, &str)>,
) -> (StatusCode, Value) {
    let mut builder = Request::get(path);
    if let Some((id, role)) = identity {
        builder = builder
            .header(USER_ID_HEADER, id.to_string())
            .header(USER_ROLE_HEADER, role);
    }
    let mut request = builder.body(Body::empty()).unwrap();
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::new(peer.parse().unwrap(), 51000)));

    let response = resource_router(policy).oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn gateway_identity_is_echoed() {
    let id = Uuid::new_v4();
    let (status, json) = call(gateway_policy(), "/whoami", GATEWAY, Some((id, "STUDENT"))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["authenticated"], true);
    assert_eq!(json["userId"], id.to_string());
    assert_eq!(json["role"], "STUDENT");
}

#[tokio::test]
async fn forged_headers_from_untrusted_peer_are_anonymous() {
    let (status, json) = call(
        gateway_policy(),
        "/whoami",
        "203.0.113.50",
        Some((Uuid::new_v4(), "ADMIN")),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!({ "authenticated": false }));
}

#[tokio::test]
async fn unknown_role_from_gateway_is_anonymous() {
    let (_, json) = call(gateway_policy(), "/whoami", GATEWAY, Some((Uuid::new_v4(), "ROOT"))).await;
    assert_eq!(json["authenticated"], false);
}

#[tokio::test]
async fn ownership_is_decided_locally() {
    let owner = Uuid::new_v4();
    let path = format!("/users/{owner}");

    let (status, _) = call(gateway_policy(), &path, GATEWAY, Some((owner, "APPLICANT"))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = call(gateway_policy(), &path, GATEWAY, Some((Uuid::new_v4(), "STUDENT"))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["error_code"], "forbidden");

    let (status, _) = call(gateway_policy(), &path, GATEWAY, Some((Uuid::new_v4(), "MODERATOR"))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = call(gateway_policy(), &path, GATEWAY, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error_code"], "unauthorized");
}

#[tokio::test]
async fn liveness_needs_no_identity() {
    let (status, json) = call(gateway_policy(), "/health/live", "192.0.2.1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}
