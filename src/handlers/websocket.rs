use futures_util::sink::SinkExt;
use futures_util::stream::StreamExt;
use log::{debug, error, warn};
use tokio::sync::mpsc;
use warp::ws::{Message, WebSocket};

use crate::core::connection::ConnectionId;
use crate::core::message::ServerEvent;
use crate::core::message_handler::MessageHandler;

// Handle a WebSocket connection for its whole lifetime
pub async fn handle_ws_client(ws: WebSocket, handler: MessageHandler) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

    // Generate a unique client ID
    let client_id = ConnectionId::generate();

    // Forward queued events to the socket; ends once the session is unregistered
    let writer_id = client_id.clone();
    tokio::task::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    error!("Failed to serialize event for {}: {}", writer_id, e);
                    continue;
                }
            };
            if let Err(e) = ws_tx.send(Message::text(text)).await {
                debug!("Failed to send WebSocket message to {}: {}", writer_id, e);
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    if let Err(e) = handler.server().connect(client_id.clone(), tx) {
        error!("Failed to register client {}: {}", client_id, e);
        return;
    }

    // Frames from one client are handled strictly in arrival order
    while let Some(result) = ws_rx.next().await {
        let msg = match result {
            Ok(msg) => msg,
            Err(e) => {
                warn!("WebSocket error for {}: {}", client_id, e);
                break;
            }
        };

        if msg.is_close() {
            break;
        }

        if let Ok(text) = msg.to_str() {
            if let Err(e) = handler.handle_client_message(&client_id, text) {
                warn!("Dropped message from {}: {}", client_id, e);
            }
        } else if msg.is_binary() {
            warn!("Ignoring binary frame from {}", client_id);
        }
    }

    // Client disconnected
    if let Err(e) = handler.server().disconnect(&client_id) {
        error!("Failed to clean up after {}: {}", client_id, e);
    } else {
        debug!("Session closed for {}", client_id);
    }
}
