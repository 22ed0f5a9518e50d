use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// -- Clips --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClipRequest {
    #[serde(default)]
    pub content: String,
    pub client_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateClipResponse {
    pub code: String,
}

/// Retrieval metadata returned alongside the content on every fetch.
/// `retrieval_count` is the post-increment value — the fetch that produced
/// this response is already counted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipStats {
    pub retrieval_count: u64,
    pub created: DateTime<Utc>,
    pub owner_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FetchClipResponse {
    pub content: String,
    pub stats: ClipStats,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClipRequest {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub client_id: String,
}

#[derive(Debug, Serialize)]
pub struct UpdateClipResponse {
    pub success: bool,
}

// -- History --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub code: String,
    pub preview: String,
    pub retrieval_count: u64,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub history: Vec<HistoryItem>,
}

// -- Health --

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub store_connected: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
