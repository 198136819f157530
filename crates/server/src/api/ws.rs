//! WebSocket feed of daemon status changes.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use super::handlers::StatusResponse;
use crate::metrics::{WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_LAG_EVENTS, WS_MESSAGES_SENT};
use crate::state::AppState;

/// Message pushed to WebSocket clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum WsMessage {
    /// Status, last check or last error changed.
    StatusUpdate(StatusResponse),
}

impl WsMessage {
    fn kind(&self) -> &'static str {
        match self {
            WsMessage::StatusUpdate(_) => "status_update",
        }
    }
}

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn send_message(
    sender: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &WsMessage,
) -> bool {
    let json = match serde_json::to_string(msg) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize WsMessage: {}", e);
            return true;
        }
    };
    if sender.send(Message::Text(json.into())).await.is_err() {
        debug!("WebSocket send failed, client disconnected");
        return false;
    }
    WS_MESSAGES_SENT.with_label_values(&[msg.kind()]).inc();
    true
}

/// Handle a single WebSocket connection.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe first so nothing between the snapshot and the feed is lost.
    let mut rx = state.daemon().subscribe();
    let initial = WsMessage::StatusUpdate(state.daemon().status().into());

    WS_CONNECTIONS_TOTAL.inc();
    WS_CONNECTIONS_ACTIVE.inc();
    info!("WebSocket client connected");

    let send_task = tokio::spawn(async move {
        if !send_message(&mut sender, &initial).await {
            return;
        }
        loop {
            match rx.recv().await {
                Ok(snapshot) => {
                    let msg = WsMessage::StatusUpdate(snapshot.into());
                    if !send_message(&mut sender, &msg).await {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("WebSocket client lagged, skipped {} messages", n);
                    WS_LAG_EVENTS.inc();
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Status channel closed");
                    break;
                }
            }
        }
    });

    while let Some(result) = receiver.next().await {
        match result {
            Ok(Message::Close(_)) => {
                debug!("WebSocket client requested close");
                break;
            }
            Ok(Message::Text(text)) => {
                debug!("Ignoring client message: {}", text);
            }
            Ok(_) => {}
            Err(e) => {
                warn!("WebSocket receive error: {}", e);
                break;
            }
        }
    }

    send_task.abort();
    WS_CONNECTIONS_ACTIVE.dec();
    info!("WebSocket client disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use anisync_core::{DaemonStatus, StateSnapshot};

    #[test]
    fn test_status_update_wire_format() {
        let snapshot = StateSnapshot {
            status: DaemonStatus::Checking,
            last_check: None,
            last_error: Some("tracker unreachable".to_string()),
        };
        let json = serde_json::to_value(WsMessage::StatusUpdate(snapshot.into())).unwrap();

        assert_eq!(json["type"], "status_update");
        assert_eq!(json["data"]["status"], "checking");
        assert_eq!(json["data"]["has_error"], true);
        assert_eq!(json["data"]["last_error"], "tracker unreachable");
        assert!(json["data"]["last_check"].is_null());
    }
}
