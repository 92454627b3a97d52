pub mod auth;
pub mod channel;
pub mod config;
pub mod http;
pub mod registry;
pub mod state;
pub mod stats;
pub mod writer;

pub use state::AppState;

use axum::http::{HeaderValue, Method};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::CorsOrigins;

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/api/logs/stream", get(http::subscribe::stream_logs))
        .route("/api/logs/publish", post(http::publish::publish_logs))
        .route("/test/logs", post(http::publish::publish_logs))
        .route("/health", get(http::health::health))
        .route("/admin/logs/stats", get(http::health::admin_stats))
        .route("/healthz", get(http::health::healthz))
        .route("/readyz", get(http::health::readyz))
        .fallback(fallback_404)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &CorsOrigins) -> CorsLayer {
    let allow_origin = match origins {
        CorsOrigins::Any => AllowOrigin::any(),
        CorsOrigins::List(list) => {
            let parsed: Vec<HeaderValue> = list
                .iter()
                .filter_map(|origin| HeaderValue::from_str(origin).ok())
                .collect();
            AllowOrigin::list(parsed)
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(tower_http::cors::Any)
}

async fn fallback_404() -> impl IntoResponse {
    http::response::not_found("unknown path")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn build_router_does_not_panic_on_construction() {
        let state = AppState::new(Config::from_env());
        let _router = build_router(state);
    }
}
