// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Downstream side of the identity header contract.
//!
//! [`accept_trusted_identity`] turns the propagated headers into a
//! [`RequestIdentity`] stored in request extensions. Anything short of a
//! well-formed pair from a trusted peer is anonymous; this layer never fails
//! a request on its own.

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap, HeaderName},
    middleware::Next,
    response::Response,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{USER_ID_HEADER, USER_ROLE_HEADER};
use crate::auth::error::RejectReason;
use crate::auth::{AuthError, Role};

/// Which peers may set identity headers.
///
/// `Topology` trusts every peer and must be chosen explicitly; the resource
/// service must then only be reachable through the gateway. The default is
/// an empty peer list, which trusts nobody.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrustPolicy {
    Topology,
    Peers(Vec<IpAddr>),
}

impl Default for TrustPolicy {
    fn default() -> Self {
        TrustPolicy::Peers(Vec::new())
    }
}

impl TrustPolicy {
    pub fn new(trusted_peers: Vec<IpAddr>) -> Self {
        TrustPolicy::Peers(trusted_peers.into_iter().map(|ip| ip.to_canonical()).collect())
    }

    pub fn topology() -> Self {
        TrustPolicy::Topology
    }

    pub fn delegates_to_topology(&self) -> bool {
        matches!(self, TrustPolicy::Topology)
    }

    /// Whether headers from this peer are honoured. An unknown peer address
    /// is only trusted under `Topology`.
    pub fn allows(&self, peer: Option<SocketAddr>) -> bool {
        match self {
            TrustPolicy::Topology => true,
            TrustPolicy::Peers(peers) => {
                peer.is_some_and(|addr| peers.contains(&addr.ip().to_canonical()))
            }
        }
    }
}

/// Verified identity as seen by a resource service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub user_id: Uuid,
    pub role: Role,
}

impl Principal {
    pub fn has_role(&self, required: Role) -> bool {
        self.role.has_privilege(required)
    }
}

/// Request-scoped identity. Built once per request, never cached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RequestIdentity {
    #[default]
    Anonymous,
    Authenticated(Principal),
}

impl RequestIdentity {
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            RequestIdentity::Anonymous => None,
            RequestIdentity::Authenticated(principal) => Some(principal),
        }
    }
}

/// Parse the identity headers.
///
/// Both headers must be present exactly once. The role header must hold a
/// single known role; a comma-separated list is not a role and yields
/// anonymous.
pub fn identity_from_headers(headers: &HeaderMap) -> RequestIdentity {
    let Some(user_id) = single_value(headers, &USER_ID_HEADER) else {
        return RequestIdentity::Anonymous;
    };
    let Some(role) = single_value(headers, &USER_ROLE_HEADER) else {
        return RequestIdentity::Anonymous;
    };

    let Ok(user_id) = Uuid::parse_str(user_id.trim()) else {
        tracing::debug!("identity header carries a malformed user id");
        return RequestIdentity::Anonymous;
    };
    let Ok(role) = Role::parse(role) else {
        tracing::debug!(role, "identity header carries an unrecognised role");
        return RequestIdentity::Anonymous;
    };

    RequestIdentity::Authenticated(Principal { user_id, role })
}

fn single_value<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    let mut values = headers.get_all(name).iter();
    let value = values.next()?;
    if values.next().is_some() {
        return None;
    }
    value.to_str().ok()
}

/// Middleware for resource services: attach a [`RequestIdentity`] and strip
/// the raw identity headers so handlers can only see the vetted value.
///
/// The peer address comes from `ConnectInfo`, so the server must be started
/// with `into_make_service_with_connect_info::<SocketAddr>()` when the policy
/// lists trusted proxies.
pub async fn accept_trusted_identity(
    State(policy): State<Arc<TrustPolicy>>,
    mut request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let identity = if policy.allows(peer) {
        identity_from_headers(request.headers())
    } else {
        if request.headers().contains_key(USER_ID_HEADER)
            || request.headers().contains_key(USER_ROLE_HEADER)
        {
            tracing::warn!(
                peer = ?peer,
                "ignoring identity headers from untrusted peer"
            );
        }
        RequestIdentity::Anonymous
    };

    let headers = request.headers_mut();
    headers.remove(USER_ID_HEADER);
    headers.remove(USER_ROLE_HEADER);

    request.extensions_mut().insert(identity);
    next.run(request).await
}

/// Extractor for the request identity. Never rejects.
pub struct Identity(pub RequestIdentity);

impl<S: Send + Sync> FromRequestParts<S> for Identity {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Identity(
            parts
                .extensions
                .get::<RequestIdentity>()
                .cloned()
                .unwrap_or_default(),
        ))
    }
}

/// Extractor that requires a propagated principal.
///
/// Anonymous requests get the same 401 the front door returns for a bad token.
pub struct RequirePrincipal(pub Principal);

impl<S: Send + Sync> FromRequestParts<S> for RequirePrincipal {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestIdentity>()
            .and_then(RequestIdentity::principal)
            .cloned()
            .map(RequirePrincipal)
            .ok_or(AuthError::TokenRejected(RejectReason::MissingToken))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, middleware, routing::get, Router};
    use tower::ServiceExt;

    const GATEWAY: &str = "10.0.0.2";

    fn headers(pairs: &[(&HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append((*name).clone(), value.parse().unwrap());
        }
        map
    }

    fn peer(ip: &str) -> Option<SocketAddr> {
        Some(SocketAddr::new(ip.parse().unwrap(), 40000))
    }

    #[test]
    fn well_formed_pair_is_authenticated() {
        let id = Uuid::new_v4();
        let id_value = id.to_string();
        let identity = identity_from_headers(&headers(&[
            (&USER_ID_HEADER, id_value.as_str()),
            (&USER_ROLE_HEADER, "moderator"),
        ]));
        assert_eq!(
            identity,
            RequestIdentity::Authenticated(Principal {
                user_id: id,
                role: Role::Moderator
            })
        );
    }

    #[test]
    fn partial_or_malformed_headers_are_anonymous() {
        let id = Uuid::new_v4().to_string();
        let id = id.as_str();
        let cases = [
            headers(&[]),
            headers(&[(&USER_ID_HEADER, id)]),
            headers(&[(&USER_ROLE_HEADER, "STUDENT")]),
            headers(&[(&USER_ID_HEADER, "not-a-uuid"), (&USER_ROLE_HEADER, "STUDENT")]),
            headers(&[(&USER_ID_HEADER, id), (&USER_ROLE_HEADER, "ROOT")]),
            headers(&[(&USER_ID_HEADER, id), (&USER_ROLE_HEADER, "STUDENT,ADMIN")]),
            headers(&[
                (&USER_ID_HEADER, id),
                (&USER_ROLE_HEADER, "STUDENT"),
                (&USER_ROLE_HEADER, "ADMIN"),
            ]),
        ];
        for case in cases {
            assert_eq!(identity_from_headers(&case), RequestIdentity::Anonymous, "{case:?}");
        }
    }

    #[test]
    fn default_policy_trusts_nobody() {
        let policy = TrustPolicy::default();
        assert!(!policy.delegates_to_topology());
        assert!(!policy.allows(None));
        assert!(!policy.allows(peer(GATEWAY)));
        assert_eq!(TrustPolicy::new(Vec::new()), policy);
    }

    #[test]
    fn topology_policy_trusts_every_peer() {
        let policy = TrustPolicy::topology();
        assert!(policy.delegates_to_topology());
        assert!(policy.allows(None));
        assert!(policy.allows(peer("203.0.113.9")));
    }

    #[test]
    fn listed_policy_only_trusts_listed_peers() {
        let policy = TrustPolicy::new(vec![GATEWAY.parse().unwrap()]);
        assert!(policy.allows(peer(GATEWAY)));
        assert!(policy.allows(peer("::ffff:10.0.0.2")));
        assert!(!policy.allows(peer("10.0.0.3")));
        assert!(!policy.allows(None));
    }

    async fn echo(Identity(identity): Identity, request_headers: HeaderMap) -> String {
        let leaked = request_headers.contains_key(USER_ID_HEADER);
        match identity {
            RequestIdentity::Anonymous => format!("anonymous leaked={leaked}"),
            RequestIdentity::Authenticated(p) => format!("{} {} leaked={leaked}", p.user_id, p.role),
        }
    }

    async fn strict(RequirePrincipal(principal): RequirePrincipal) -> String {
        principal.role.to_string()
    }

    fn app(policy: TrustPolicy) -> Router {
        Router::new()
            .route("/echo", get(echo))
            .route("/strict", get(strict))
            .layer(middleware::from_fn_with_state(Arc::new(policy), accept_trusted_identity))
    }

    async fn call(app: Router, path: &str, from: Option<&str>, id: &Uuid) -> (StatusCode, String) {
        let mut request = axum::http::Request::builder()
            .uri(path)
            .header(USER_ID_HEADER, id.to_string())
            .header(USER_ROLE_HEADER, "ADMIN")
            .body(Body::empty())
            .unwrap();
        if let Some(ip) = from {
            request
                .extensions_mut()
                .insert(ConnectInfo(SocketAddr::new(ip.parse().unwrap(), 5000)));
        }
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn trusted_peer_headers_become_identity_and_are_stripped() {
        let id = Uuid::new_v4();
        let policy = TrustPolicy::new(vec![GATEWAY.parse().unwrap()]);
        let (status, body) = call(app(policy), "/echo", Some(GATEWAY), &id).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, format!("{id} ADMIN leaked=false"));
    }

    #[tokio::test]
    async fn forged_headers_from_untrusted_peer_are_anonymous() {
        let id = Uuid::new_v4();
        let policy = TrustPolicy::new(vec![GATEWAY.parse().unwrap()]);
        let (status, body) = call(app(policy.clone()), "/echo", Some("198.51.100.7"), &id).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "anonymous leaked=false");

        let (status, _) = call(app(policy), "/strict", Some("198.51.100.7"), &id).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn require_principal_accepts_trusted_identity() {
        let id = Uuid::new_v4();
        let (status, body) = call(app(TrustPolicy::topology()), "/strict", None, &id).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ADMIN");
    }

    #[tokio::test]
    async fn default_policy_ignores_direct_clients() {
        let id = Uuid::new_v4();
        let (status, body) = call(app(TrustPolicy::default()), "/echo", Some(GATEWAY), &id).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "anonymous leaked=false");
    }
}
