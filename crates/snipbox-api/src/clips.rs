use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::info;

use snipbox_store::ClipSnapshot;
use snipbox_types::api::{
    ClipStats, CreateClipRequest, CreateClipResponse, FetchClipResponse, UpdateClipRequest,
    UpdateClipResponse,
};
use snipbox_types::events::RoomEvent;

use crate::error::ApiError;
use crate::{AppState, ensure_store, with_store};

/// POST /api/clips — store content under a fresh code.
///
/// When the caller asserts a client id, the clip is registered to it (which
/// is the only thing that grants edit rights later) and the code is
/// prepended to that client's history.
pub async fn create_clip(
    State(state): State<AppState>,
    Json(req): Json<CreateClipRequest>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_store(&state).await?;

    if req.content.is_empty() {
        return Err(ApiError::Validation("content is required"));
    }

    let client_id = req.client_id.as_deref().filter(|id| !id.is_empty());
    let code = with_store(state.store.create(&req.content, client_id)).await??;

    if let Some(client_id) = client_id {
        with_store(state.store.append_history(client_id, &code)).await?;
    }

    info!("Clip {} created ({} bytes)", code, req.content.len());

    Ok((StatusCode::CREATED, Json(CreateClipResponse { code })))
}

/// GET /api/clips/{code} — fetch content and stats.
///
/// The retrieval count increment is an observable side effect of this read:
/// the response carries the post-increment value, and the room is told.
pub async fn fetch_clip(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<FetchClipResponse>, ApiError> {
    ensure_store(&state).await?;

    let snapshot = with_store(state.store.get(&code)).await??;
    let ClipSnapshot {
        content,
        retrieval_count,
        created_at,
        owner_id,
    } = snapshot;

    state
        .hub
        .broadcast(&code, RoomEvent::ContentRetrieved { count: retrieval_count })
        .await;

    Ok(Json(FetchClipResponse {
        content,
        stats: ClipStats {
            retrieval_count,
            created: created_at,
            owner_id,
        },
    }))
}

/// PUT /api/clips/{code} — replace content, owner only.
///
/// The entry keeps its original deadline, creation time, owner, and count.
pub async fn update_clip(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(req): Json<UpdateClipRequest>,
) -> Result<Json<UpdateClipResponse>, ApiError> {
    ensure_store(&state).await?;

    if req.content.is_empty() {
        return Err(ApiError::Validation("content is required"));
    }
    if req.client_id.is_empty() {
        return Err(ApiError::Validation("client id is required"));
    }

    with_store(state.store.update(&code, &req.content, &req.client_id)).await??;

    info!("Clip {} updated by {}", code, req.client_id);

    state
        .hub
        .broadcast(
            &code,
            RoomEvent::ContentUpdated {
                updated_by: Some(req.client_id),
                timestamp: chrono::Utc::now(),
            },
        )
        .await;

    Ok(Json(UpdateClipResponse { success: true }))
}
