use crate::config::BrokerConfig;
use crate::signaling::{SignalingRelay, ws_handler};
use crate::sweeper::run_sweeper;
use anyhow::{Context, Result};
use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;
use tracing::info;

pub fn router(relay: SignalingRelay) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .with_state(relay)
}

async fn health() -> &'static str {
    "ok"
}

/// Binds the listener, starts the sweeper and serves until the listener fails.
pub async fn serve(config: BrokerConfig) -> Result<()> {
    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    serve_on(listener, config).await
}

pub async fn serve_on(listener: TcpListener, config: BrokerConfig) -> Result<()> {
    let relay = SignalingRelay::new(config);
    tokio::spawn(run_sweeper(relay.clone()));

    info!(
        "Proximity broker listening on ws://{}/ws (range {})",
        listener.local_addr()?,
        relay.config().range
    );
    axum::serve(listener, router(relay)).await?;
    Ok(())
}
