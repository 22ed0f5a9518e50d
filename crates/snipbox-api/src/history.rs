use axum::Json;
use axum::extract::{Path, State};

use snipbox_types::api::{HistoryItem, HistoryResponse};

use crate::error::ApiError;
use crate::{AppState, ensure_store, with_store};

/// Preview length in characters, with a truncation marker beyond it.
const PREVIEW_CHARS: usize = 50;

/// GET /api/history/{client_id} — codes this client created, most recent
/// first, resolved against the live store.
///
/// History references are weak: codes whose entry has expired are dropped
/// from the result, never reported as errors. An unknown client gets an
/// empty list. Resolution reads do not count as retrievals.
pub async fn get_history(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
    ensure_store(&state).await?;

    let codes = with_store(state.store.list_history(&client_id)).await?;

    let mut history = Vec::with_capacity(codes.len());
    for code in codes {
        let Some(snapshot) = with_store(state.store.peek(&code)).await? else {
            continue;
        };
        history.push(HistoryItem {
            preview: preview(&snapshot.content),
            retrieval_count: snapshot.retrieval_count,
            created: snapshot.created_at,
            code,
        });
    }

    Ok(Json(HistoryResponse { history }))
}

fn preview(content: &str) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_content_is_untouched() {
        assert_eq!(preview("hello"), "hello");
    }

    #[test]
    fn exact_length_gets_no_marker() {
        let content = "y".repeat(PREVIEW_CHARS);
        assert_eq!(preview(&content), content);
    }

    #[test]
    fn long_content_is_truncated_with_marker() {
        let content = "z".repeat(PREVIEW_CHARS + 1);
        assert_eq!(preview(&content), format!("{}...", "z".repeat(PREVIEW_CHARS)));
    }

    #[test]
    fn truncation_counts_chars_not_bytes() {
        let content = "é".repeat(PREVIEW_CHARS + 5);
        assert_eq!(preview(&content), format!("{}...", "é".repeat(PREVIEW_CHARS)));
    }
}
