use logbroker::config::Config;
use logbroker::state::AppState;
use std::env;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_owned());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level))
        .init();

    let config = Config::from_env();
    let bind_addr = config.bind_addr.clone();

    let state = AppState::new(config);
    let shutdown = state.shutdown.clone();
    let router = logbroker::build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("failed to bind");
    info!(addr = %bind_addr, "broker listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .expect("server error");
    info!("broker shut down gracefully");
}

/// Waits for SIGTERM or Ctrl-C (SIGINT), then broadcasts shutdown to every
/// connected writer before returning to axum's own graceful-shutdown wait.
/// Without this broadcast, an indefinite SSE stream has no reason to ever
/// exit its `select!` loop, so `axum::serve`'s graceful-shutdown wait would
/// hang as long as any subscriber is connected (§5, §8).
async fn shutdown_signal(shutdown: tokio::sync::broadcast::Sender<()>) {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { info!("received Ctrl+C, shutting down"); },
        _ = terminate => { info!("received SIGTERM, shutting down"); },
    }

    let _ = shutdown.send(());
}
