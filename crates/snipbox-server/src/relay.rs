use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use snipbox_gateway::Hub;
use snipbox_store::{Mutation, Store};
use snipbox_types::events::RoomEvent;

/// Forward raw store mutations to the affected rooms.
///
/// Update commands already broadcast an attributed `content-updated`; this
/// relay additionally surfaces content writes that did not come through the
/// update path. Subscribers may therefore see the same update twice —
/// best-effort redundancy, not exactly-once delivery.
pub async fn run_mutation_relay(store: Store, hub: Hub) {
    let mut feed = store.mutations();

    loop {
        match feed.recv().await {
            Ok(Mutation::ContentWritten { code }) => {
                hub.broadcast(
                    &code,
                    RoomEvent::ContentUpdated {
                        updated_by: None,
                        timestamp: chrono::Utc::now(),
                    },
                )
                .await;
            }
            Err(RecvError::Lagged(n)) => {
                warn!("Mutation feed lagged by {} records", n);
            }
            Err(RecvError::Closed) => break,
        }
    }
}
