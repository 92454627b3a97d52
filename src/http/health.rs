use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use logbroker_protocol::{AdminStatsResponse, ChannelStats, HealthResponse, SubscriberStats};

use crate::state::AppState;

/// `GET /health` (§4.6, §6.3): a consistent, bounded-read snapshot of
/// process status and global counters.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        connections: state.registry.connection_count(),
        channels: state.registry.channel_count(),
        uptime_ms: state.stats.uptime_ms(),
        stats: state.stats.snapshot(),
    })
}

/// `GET /admin/logs/stats` (§4.6, §6.3): per-channel subscriber detail plus
/// global counters.
pub async fn admin_stats(State(state): State<AppState>) -> Json<AdminStatsResponse> {
    let channels = state
        .registry
        .channel_snapshot()
        .into_iter()
        .map(|(channel, handles)| ChannelStats {
            channel,
            subscriber_count: handles.len(),
            subscribers: handles
                .iter()
                .map(|handle| SubscriberStats {
                    connection_id: handle.id.to_string(),
                    user_id: handle.principal.user_id.clone(),
                    connected_at: handle.connected_at.timestamp_millis(),
                    logs_sent: handle.messages_sent(),
                })
                .collect(),
        })
        .collect();

    Json(AdminStatsResponse {
        channels,
        stats: state.stats.snapshot(),
    })
}

/// Liveness probe, distinct from the detailed `/health` document.
pub async fn healthz() -> impl IntoResponse {
    "ok"
}

/// Readiness probe, distinct from the detailed `/health` document.
pub async fn readyz() -> impl IntoResponse {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Principal;
    use crate::config::Config;
    use std::collections::HashSet;

    #[tokio::test]
    async fn health_reports_zero_connections_on_a_fresh_state() {
        let state = AppState::new(Config::from_env());
        let Json(response) = health(State(state)).await;
        assert_eq!(response.status, "healthy");
        assert_eq!(response.connections, 0);
        assert_eq!(response.channels, 0);
    }

    #[tokio::test]
    async fn admin_stats_reports_registered_subscriber_detail() {
        let state = AppState::new(Config::from_env());
        state.registry.register(
            Principal {
                user_id: "user123".to_owned(),
                workspaces: HashSet::new(),
                permissions: HashSet::new(),
            },
            vec!["logs:etl:workspace123".to_owned()],
            8,
        );

        let Json(response) = admin_stats(State(state)).await;
        assert_eq!(response.channels.len(), 1);
        assert_eq!(response.channels[0].subscriber_count, 1);
        assert_eq!(response.channels[0].subscribers[0].user_id, "user123");
    }
}
