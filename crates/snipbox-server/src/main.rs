mod relay;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
    routing::{get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use snipbox_api::{AppState, AppStateInner, clips, health, history};
use snipbox_gateway::{Hub, connection};
use snipbox_store::{Store, StoreConfig, sweep};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "snipbox=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let host = std::env::var("SNIPBOX_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("SNIPBOX_PORT")
        .unwrap_or_else(|_| "4000".into())
        .parse()?;
    let entry_ttl_secs: u64 = std::env::var("SNIPBOX_ENTRY_TTL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(86400); // 24 hours
    let history_cap: usize = std::env::var("SNIPBOX_HISTORY_CAP")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(100);
    let sweep_interval_secs: u64 = std::env::var("SNIPBOX_SWEEP_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3600);

    // Shared state
    let store = Store::new(StoreConfig {
        entry_ttl: Duration::from_secs(entry_ttl_secs),
        history_cap,
        ..StoreConfig::default()
    });
    let hub = Hub::new();

    // Background tasks: expiry sweeper and the store-mutation relay
    tokio::spawn(sweep::run_sweep_loop(store.clone(), sweep_interval_secs));
    tokio::spawn(relay::run_mutation_relay(store.clone(), hub.clone()));

    let state: AppState = Arc::new(AppStateInner {
        store,
        hub,
    });

    // Routes
    let app = Router::new()
        .route("/api/clips", post(clips::create_clip))
        .route("/api/clips/{code}", get(clips::fetch_clip))
        .route("/api/clips/{code}", put(clips::update_clip))
        .route("/api/history/{client_id}", get(history::get_history))
        .route("/api/health", get(health::health))
        .route("/ws", get(ws_upgrade))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Snipbox listening on {}", addr);
    info!(
        "Entry TTL: {} hours, history cap: {}",
        entry_ttl_secs / 3600,
        history_cap
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        connection::handle_connection(socket, state.hub.clone(), state.store.clone())
    })
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
