pub mod clips;
pub mod error;
pub mod health;
pub mod history;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use snipbox_gateway::Hub;
use snipbox_store::Store;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub store: Store,
    pub hub: Hub,
}

/// Bound on any single store round-trip. A store that cannot answer within
/// this window is reported as unavailable instead of hanging the command.
const STORE_TIMEOUT: Duration = Duration::from_secs(2);

/// Defensive availability check run at the start of every command, so a
/// wedged store short-circuits into a connectivity-specific failure rather
/// than an ambiguous low-level timeout mid-command.
pub(crate) async fn ensure_store(state: &AppState) -> Result<(), ApiError> {
    match tokio::time::timeout(STORE_TIMEOUT, state.store.probe()).await {
        Ok(true) => Ok(()),
        Ok(false) => Err(ApiError::Internal),
        Err(_) => Err(ApiError::Unavailable),
    }
}

/// Apply the round-trip bound to one store operation.
pub(crate) async fn with_store<T>(op: impl Future<Output = T>) -> Result<T, ApiError> {
    tokio::time::timeout(STORE_TIMEOUT, op)
        .await
        .map_err(|_| ApiError::Unavailable)
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use axum::routing::{get, post, put};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use snipbox_store::StoreConfig;
    use snipbox_types::events::RoomEvent;

    fn app() -> (Router, AppState) {
        let state: AppState = Arc::new(AppStateInner {
            store: Store::new(StoreConfig::default()),
            hub: Hub::new(),
        });
        let router = Router::new()
            .route("/api/clips", post(clips::create_clip))
            .route("/api/clips/{code}", get(clips::fetch_clip))
            .route("/api/clips/{code}", put(clips::update_clip))
            .route("/api/history/{client_id}", get(history::get_history))
            .route("/api/health", get(health::health))
            .with_state(state.clone());
        (router, state)
    }

    async fn request(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        let request = match body {
            Some(body) => builder.body(Body::from(body.to_string())).unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn create_fetch_update_round_trip() {
        let (router, _state) = app();

        // Create as u1.
        let (status, body) = request(
            &router,
            "POST",
            "/api/clips",
            Some(json!({"content": "hello", "clientId": "u1"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let code = body["code"].as_str().unwrap().to_string();
        assert_eq!(code.len(), 6);

        // Fetch counts the retrieval and reports the owner.
        let (status, body) = request(&router, "GET", &format!("/api/clips/{code}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["content"], "hello");
        assert_eq!(body["stats"]["retrievalCount"], 1);
        assert_eq!(body["stats"]["ownerId"], "u1");

        // A non-owner may not update.
        let (status, body) = request(
            &router,
            "PUT",
            &format!("/api/clips/{code}"),
            Some(json!({"content": "stolen", "clientId": "u2"})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body["error"].as_str().unwrap().contains("permission"));

        // The owner may.
        let (status, body) = request(
            &router,
            "PUT",
            &format!("/api/clips/{code}"),
            Some(json!({"content": "world", "clientId": "u1"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let (status, body) = request(&router, "GET", &format!("/api/clips/{code}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["content"], "world");
        assert_eq!(body["stats"]["retrievalCount"], 2);
    }

    #[tokio::test]
    async fn create_requires_content() {
        let (router, _state) = app();

        let (status, body) =
            request(&router, "POST", "/api/clips", Some(json!({"content": ""}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "content is required");
    }

    #[tokio::test]
    async fn update_requires_content_and_client_id() {
        let (router, _state) = app();

        let (status, _) = request(
            &router,
            "PUT",
            "/api/clips/abc123",
            Some(json!({"content": "", "clientId": "u1"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = request(
            &router,
            "PUT",
            "/api/clips/abc123",
            Some(json!({"content": "x"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn fetch_unknown_code_is_not_found() {
        let (router, _state) = app();

        let (status, body) = request(&router, "GET", "/api/clips/zzzzzz", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "clip not found or expired");
    }

    #[tokio::test]
    async fn anonymous_clip_cannot_be_updated() {
        let (router, _state) = app();

        let (_, body) = request(
            &router,
            "POST",
            "/api/clips",
            Some(json!({"content": "no owner"})),
        )
        .await;
        let code = body["code"].as_str().unwrap().to_string();

        let (status, _) = request(
            &router,
            "PUT",
            &format!("/api/clips/{code}"),
            Some(json!({"content": "mine now", "clientId": "u1"})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn history_lists_most_recent_first_with_previews() {
        let (router, _state) = app();

        let (_, body) = request(
            &router,
            "POST",
            "/api/clips",
            Some(json!({"content": "first clip", "clientId": "u1"})),
        )
        .await;
        let first = body["code"].as_str().unwrap().to_string();

        let long_content = "x".repeat(80);
        let (_, body) = request(
            &router,
            "POST",
            "/api/clips",
            Some(json!({"content": long_content, "clientId": "u1"})),
        )
        .await;
        let second = body["code"].as_str().unwrap().to_string();

        let (status, body) = request(&router, "GET", "/api/history/u1", None).await;
        assert_eq!(status, StatusCode::OK);
        let history = body["history"].as_array().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0]["code"], second.as_str());
        assert_eq!(history[1]["code"], first.as_str());
        // Long content is previewed to 50 chars plus a truncation marker.
        assert_eq!(
            history[0]["preview"].as_str().unwrap(),
            format!("{}...", "x".repeat(50))
        );
        assert_eq!(history[1]["preview"], "first clip");
        // Resolution does not count as a retrieval.
        assert_eq!(history[0]["retrievalCount"], 0);
    }

    #[tokio::test(start_paused = true)]
    async fn history_resolution_silently_drops_expired_entries() {
        let (router, state) = app();

        request(
            &router,
            "POST",
            "/api/clips",
            Some(json!({"content": "will expire", "clientId": "u1"})),
        )
        .await;

        tokio::time::advance(state.store.config().entry_ttl + Duration::from_secs(1)).await;

        // The history list (30-day window) outlives the entry (24 h); the
        // dangling code is dropped at resolution time, not reported.
        let (status, body) = request(&router, "GET", "/api/history/u1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["history"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn history_for_unknown_client_is_empty_not_an_error() {
        let (router, _state) = app();

        let (status, body) = request(&router, "GET", "/api/history/nobody", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["history"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn fetch_broadcasts_retrieval_to_the_room() {
        let (router, state) = app();

        let (_, body) = request(
            &router,
            "POST",
            "/api/clips",
            Some(json!({"content": "watched", "clientId": "u1"})),
        )
        .await;
        let code = body["code"].as_str().unwrap().to_string();

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        state.hub.join(&code, uuid::Uuid::new_v4(), tx).await;

        request(&router, "GET", &format!("/api/clips/{code}"), None).await;
        assert!(matches!(
            rx.recv().await,
            Some(RoomEvent::ContentRetrieved { count: 1 })
        ));

        let (_, _) = request(
            &router,
            "PUT",
            &format!("/api/clips/{code}"),
            Some(json!({"content": "v2", "clientId": "u1"})),
        )
        .await;
        assert!(matches!(
            rx.recv().await,
            Some(RoomEvent::ContentUpdated { updated_by: Some(by), .. }) if by == "u1"
        ));
    }

    #[tokio::test]
    async fn health_reports_store_status() {
        let (router, _state) = app();

        let (status, body) = request(&router, "GET", "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["storeConnected"], true);
    }
}
