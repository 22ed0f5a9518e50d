use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use snipbox_types::api::HealthResponse;

use crate::{AppState, STORE_TIMEOUT};

/// GET /api/health — liveness of the store, via a real probe round-trip.
/// The rendering shell gates its whole UI on this.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let connected = matches!(
        tokio::time::timeout(STORE_TIMEOUT, state.store.probe()).await,
        Ok(true)
    );

    let status = if connected {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    (
        status,
        Json(HealthResponse {
            status: if connected { "ok" } else { "error" }.to_string(),
            store_connected: connected,
        }),
    )
}
