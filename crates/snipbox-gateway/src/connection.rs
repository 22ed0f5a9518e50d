use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use snipbox_store::Store;
use snipbox_types::events::{RoomCommand, RoomEvent};

use crate::hub::Hub;

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Handle a single WebSocket connection for its whole lifetime.
///
/// The connection carries no identity of its own; clients assert a client id
/// per clip through the `identify` command. On any exit path the connection
/// is removed from every room it joined.
pub async fn handle_connection(socket: WebSocket, hub: Hub, store: Store) {
    let conn_id = Uuid::new_v4();
    let (mut sender, mut receiver) = socket.split();

    info!("Connection {} opened", conn_id);

    // Events fanned out by the hub for rooms this connection joined.
    let (tx, mut rx) = mpsc::unbounded_channel::<RoomEvent>();

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    // Forward room events -> client, with heartbeat.
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                event = rx.recv() => {
                    let event = match event {
                        Some(event) => event,
                        None => break,
                    };
                    let text = serde_json::to_string(&event).unwrap();
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("Heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Read commands from the client.
    let hub_recv = hub.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<RoomCommand>(&text) {
                    Ok(cmd) => {
                        handle_command(&hub_recv, &store, conn_id, &tx, cmd).await;
                    }
                    Err(e) => {
                        warn!(
                            "Connection {} bad command: {} -- raw: {}",
                            conn_id,
                            e,
                            &text[..text.len().min(200)]
                        );
                    }
                },
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    hub.disconnect(conn_id).await;
    info!("Connection {} closed", conn_id);
}

async fn handle_command(
    hub: &Hub,
    store: &Store,
    conn_id: Uuid,
    tx: &mpsc::UnboundedSender<RoomEvent>,
    cmd: RoomCommand,
) {
    match cmd {
        RoomCommand::JoinRoom { code } => {
            debug!("Connection {} joined room {}", conn_id, code);
            hub.join(&code, conn_id, tx.clone()).await;
        }

        RoomCommand::LeaveRoom { code } => {
            debug!("Connection {} left room {}", conn_id, code);
            hub.leave(&code, conn_id).await;
        }

        RoomCommand::Identify { client_id, code } => {
            if client_id.is_empty() || code.is_empty() {
                return;
            }
            let count = store.announce(&code, &client_id).await;
            hub.broadcast(&code, RoomEvent::ViewersUpdated { count }).await;
        }
    }
}
