use std::sync::Arc;

use tokio::sync::broadcast;

use crate::auth::{HeaderPrincipalResolver, PrincipalResolver, ServiceAuthenticator, StaticTokenAuthenticator};
use crate::config::Config;
use crate::registry::ConnectionRegistry;
use crate::stats::Stats;

/// Broadcast capacity for the shutdown notification. A single `()` is ever
/// sent; the buffer only needs to be nonzero for `broadcast::channel` to
/// accept the call.
const SHUTDOWN_CHANNEL_CAPACITY: usize = 1;

/// Shared application state handed to every HTTP handler. Owns the
/// registry, the two external-collaborator interfaces, and the shutdown
/// broadcast every writer subscribes to; holds no secrets itself.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<ConnectionRegistry>,
    pub stats: Arc<Stats>,
    pub principal_resolver: Arc<dyn PrincipalResolver>,
    pub service_authenticator: Arc<dyn ServiceAuthenticator>,
    /// Sent once on graceful shutdown; every writer's `connection_stream`
    /// holds a `subscribe()`d receiver and exits as soon as it fires (§5,
    /// §4.7).
    pub shutdown: broadcast::Sender<()>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let stats = Arc::new(Stats::new());
        let registry = Arc::new(ConnectionRegistry::new(stats.clone()));
        let service_authenticator = Arc::new(StaticTokenAuthenticator::new(
            config.service_tokens.clone(),
        ));
        let (shutdown, _) = broadcast::channel(SHUTDOWN_CHANNEL_CAPACITY);

        Self {
            config: Arc::new(config),
            registry,
            stats,
            principal_resolver: Arc::new(HeaderPrincipalResolver),
            service_authenticator,
            shutdown,
        }
    }

    /// Builds an `AppState` with caller-supplied collaborators, used by
    /// tests that need a fake resolver/authenticator instead of the
    /// reference (header/static-token) implementations.
    pub fn with_collaborators(
        config: Config,
        principal_resolver: Arc<dyn PrincipalResolver>,
        service_authenticator: Arc<dyn ServiceAuthenticator>,
    ) -> Self {
        let stats = Arc::new(Stats::new());
        let registry = Arc::new(ConnectionRegistry::new(stats.clone()));
        let (shutdown, _) = broadcast::channel(SHUTDOWN_CHANNEL_CAPACITY);

        Self {
            config: Arc::new(config),
            registry,
            stats,
            principal_resolver,
            service_authenticator,
            shutdown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_builds_empty_registry_and_zeroed_stats() {
        let state = AppState::new(Config::from_env());
        assert_eq!(state.registry.connection_count(), 0);
        let snap = state.stats.snapshot();
        assert_eq!(snap.total_connections, 0);
        assert_eq!(snap.total_publishes, 0);
    }
}
