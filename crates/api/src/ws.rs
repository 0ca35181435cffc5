//! WebSocket event forwarding.
//!
//! Every connected client receives the full platform event stream as
//! JSON text frames. The broadcast channel inside [`EventBus`] does the
//! fan-out, so there is no separate connection registry; each socket
//! holds its own receiver.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use shotforge_events::ShotEvent;
use tokio::sync::broadcast;

use crate::state::AppState;

/// HTTP handler that upgrades the connection to WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let events = state.event_bus.subscribe();
    ws.on_upgrade(move |socket| handle_socket(socket, events))
}

/// Manage a single WebSocket connection after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), then:
///   1. Spawns a sender task that serializes bus events into text frames.
///   2. Drains inbound messages on the current task until the client
///      closes or errors.
///   3. Aborts the sender on disconnect.
async fn handle_socket(socket: WebSocket, mut events: broadcast::Receiver<ShotEvent>) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, "WebSocket connected");

    let (mut sink, mut stream) = socket.split();

    // Sender task: forward bus events to the WebSocket sink.
    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    let text = match serde_json::to_string(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to serialize event");
                            continue;
                        }
                    };
                    if sink.send(Message::Text(text.into())).await.is_err() {
                        tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                        break;
                    }
                }
                // A slow client misses events rather than stalling the
                // bus; tell the log how many.
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        conn_id = %sender_conn_id,
                        skipped,
                        "WebSocket client lagged behind the event stream"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Receiver loop: drain inbound messages.
    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Ok(_msg) => {
                // Clients send nothing meaningful today; frames are dropped.
            }
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    send_task.abort();
    tracing::info!(conn_id = %conn_id, "WebSocket disconnected");
}
