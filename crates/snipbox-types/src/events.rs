use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Events sent over the WebSocket to every subscriber of a clip's room.
///
/// Delivery is best-effort and at-most-once: a client that is not connected
/// when an event fires never sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum RoomEvent {
    /// The clip's content changed. `updated_by` is absent when the write
    /// was observed through the store mutation feed rather than the update
    /// command.
    #[serde(rename_all = "camelCase")]
    ContentUpdated {
        #[serde(skip_serializing_if = "Option::is_none")]
        updated_by: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// Someone fetched the clip. Carries the post-increment retrieval count.
    ContentRetrieved { count: u64 },

    /// The distinct viewer count for the clip changed.
    ViewersUpdated { count: usize },
}

/// Commands sent FROM client TO server over the WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum RoomCommand {
    /// Subscribe this connection to a clip's room.
    JoinRoom { code: String },

    /// Unsubscribe from a clip's room.
    LeaveRoom { code: String },

    /// Announce the client as an active viewer of a clip. Refreshes the
    /// presence record and triggers a `viewers-updated` broadcast.
    #[serde(rename_all = "camelCase")]
    Identify { client_id: String, code: String },
}
