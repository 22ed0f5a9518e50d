use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use snipbox_store::StoreError;
use snipbox_types::api::ErrorResponse;

/// Command-boundary error taxonomy. Every handler failure is mapped onto
/// exactly one of these before it leaves the crate; the JSON body carries
/// the display message.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or empty required input. User-correctable.
    #[error("{0}")]
    Validation(&'static str),

    /// Code absent or expired. Kept distinct from validation so clients can
    /// offer "create new" instead of "fix input".
    #[error("clip not found or expired")]
    NotFound,

    /// Ownership check failed. The message does not reveal anything about
    /// the clip beyond editing being denied.
    #[error("you do not have permission to edit this clip")]
    Forbidden,

    /// The store did not answer within the round-trip bound.
    #[error("service temporarily unavailable: store connection error")]
    Unavailable,

    /// The store answered incoherently. Logged; callers get a generic body.
    #[error("internal server error")]
    Internal,
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::EmptyContent => ApiError::Validation("content is required"),
            StoreError::NotFound => ApiError::NotFound,
            StoreError::Forbidden => ApiError::Forbidden,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("request failed: {}", self);
        }

        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
