use std::collections::HashMap;
use std::collections::HashSet;

use async_trait::async_trait;
use axum::http::HeaderMap;

/// The authenticated identity of a subscriber, resolved once at accept time
/// and held for the stream's lifetime. Immutable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    pub workspaces: HashSet<String>,
    pub permissions: HashSet<String>,
}

/// Resolves a `Principal` from the headers of an incoming subscribe request.
///
/// This is an abstract interface: the core holds no secrets and does not
/// prescribe an identity provider. A real deployment plugs in a resolver
/// backed by whatever session/JWT/SSO mechanism it uses; `HeaderPrincipalResolver`
/// below is a reference implementation only.
#[async_trait]
pub trait PrincipalResolver: Send + Sync {
    async fn resolve(&self, headers: &HeaderMap) -> Option<Principal>;
}

/// Reference resolver: reads `X-User-Id` (required), `X-User-Workspaces`
/// (optional, comma-separated) and `X-User-Permissions` (optional,
/// comma-separated) directly off the request headers.
pub struct HeaderPrincipalResolver;

#[async_trait]
impl PrincipalResolver for HeaderPrincipalResolver {
    async fn resolve(&self, headers: &HeaderMap) -> Option<Principal> {
        let user_id = headers.get("x-user-id")?.to_str().ok()?.trim();
        if user_id.is_empty() {
            return None;
        }

        let workspaces = header_csv(headers, "x-user-workspaces");
        let permissions = header_csv(headers, "x-user-permissions");

        Some(Principal {
            user_id: user_id.to_owned(),
            workspaces,
            permissions,
        })
    }
}

fn header_csv(headers: &HeaderMap, name: &str) -> HashSet<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

/// Decides whether a publishing service may publish to a given channel.
///
/// Like `PrincipalResolver`, this is an abstract interface; the core never
/// inspects a token's internals, it only asks the authenticator.
#[async_trait]
pub trait ServiceAuthenticator: Send + Sync {
    async fn authorize(&self, service_token: &str, declared_service: &str, channel: &str) -> bool;
}

/// Reference authenticator: a static map of `service_token -> service name`,
/// populated from configuration (`SERVICE_TOKENS`). A token authorizes a
/// publish only if it maps to exactly the declared service.
pub struct StaticTokenAuthenticator {
    tokens: HashMap<String, String>,
}

impl StaticTokenAuthenticator {
    pub fn new(tokens: HashMap<String, String>) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl ServiceAuthenticator for StaticTokenAuthenticator {
    async fn authorize(&self, service_token: &str, declared_service: &str, _channel: &str) -> bool {
        self.tokens
            .get(service_token)
            .is_some_and(|service| service == declared_service)
    }
}
