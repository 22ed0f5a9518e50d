use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use snipbox_types::events::RoomEvent;

/// Per-process room registry: which live connections are subscribed to
/// which clip code, and the fan-out of events to them.
///
/// Rooms are transient. A room exists only while it has subscribers and is
/// discarded as soon as the last one leaves or disconnects; nothing here is
/// ever persisted. Created once at startup and passed to every connection
/// handler.
#[derive(Clone)]
pub struct Hub {
    inner: Arc<HubInner>,
}

struct HubInner {
    /// code -> connection id -> outbound event channel
    rooms: RwLock<HashMap<String, HashMap<Uuid, mpsc::UnboundedSender<RoomEvent>>>>,

    /// connection id -> codes joined, for the implicit leave on disconnect
    memberships: RwLock<HashMap<Uuid, HashSet<String>>>,
}

impl Hub {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(HubInner {
                rooms: RwLock::new(HashMap::new()),
                memberships: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Subscribe a connection to a code's room.
    pub async fn join(&self, code: &str, conn_id: Uuid, tx: mpsc::UnboundedSender<RoomEvent>) {
        self.inner
            .rooms
            .write()
            .await
            .entry(code.to_string())
            .or_default()
            .insert(conn_id, tx);

        self.inner
            .memberships
            .write()
            .await
            .entry(conn_id)
            .or_default()
            .insert(code.to_string());
    }

    /// Unsubscribe a connection from a code's room, discarding the room if
    /// it became empty.
    pub async fn leave(&self, code: &str, conn_id: Uuid) {
        let mut rooms = self.inner.rooms.write().await;
        if let Some(members) = rooms.get_mut(code) {
            members.remove(&conn_id);
            if members.is_empty() {
                rooms.remove(code);
            }
        }
        drop(rooms);

        let mut memberships = self.inner.memberships.write().await;
        if let Some(codes) = memberships.get_mut(&conn_id) {
            codes.remove(code);
            if codes.is_empty() {
                memberships.remove(&conn_id);
            }
        }
    }

    /// Implicit leave from every room the connection was a member of.
    pub async fn disconnect(&self, conn_id: Uuid) {
        let codes = self.inner.memberships.write().await.remove(&conn_id);
        let Some(codes) = codes else { return };

        let mut rooms = self.inner.rooms.write().await;
        for code in codes {
            if let Some(members) = rooms.get_mut(&code) {
                members.remove(&conn_id);
                if members.is_empty() {
                    rooms.remove(&code);
                }
            }
        }
    }

    /// Push an event to every current subscriber of a code's room.
    /// Best-effort: connections that are gone are skipped.
    pub async fn broadcast(&self, code: &str, event: RoomEvent) {
        let rooms = self.inner.rooms.read().await;
        if let Some(members) = rooms.get(code) {
            for tx in members.values() {
                let _ = tx.send(event.clone());
            }
        }
    }

    /// Number of connections currently subscribed to a code.
    pub async fn subscriber_count(&self, code: &str) -> usize {
        self.inner
            .rooms
            .read()
            .await
            .get(code)
            .map(HashMap::len)
            .unwrap_or(0)
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}
