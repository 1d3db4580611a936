//! Frame Stream Route
//!
//! One WebSocket per browser tab. The server greets with `connected`, then
//! answers each `frame` event with at most one `drowsiness` event.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::protocol::ServerEvent;
use crate::session::FrameSession;
use crate::AppState;

/// Upgrade to the frame stream
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let session = match FrameSession::open(state) {
        Ok(session) => session,
        Err(e) => {
            warn!("Rejecting connection: {}", e);
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };

    if send_event(&mut socket, &ServerEvent::connected()).await.is_err() {
        session.close();
        return;
    }

    while let Some(message) = socket.recv().await {
        let message = match message {
            Ok(message) => message,
            Err(e) => {
                debug!("Socket error on {}: {}", session.id(), e);
                break;
            }
        };

        match message {
            Message::Text(text) => {
                if let Some(event) = session.handle_text(&text).await {
                    if send_event(&mut socket, &event).await.is_err() {
                        break;
                    }
                }
            }
            Message::Close(_) => break,
            // Ping/pong is answered by the socket itself
            _ => {}
        }
    }

    session.close();
}

async fn send_event(socket: &mut WebSocket, event: &ServerEvent) -> Result<(), axum::Error> {
    let json = match event.to_json() {
        Ok(json) => json,
        Err(e) => {
            warn!("Failed to encode event: {}", e);
            return Ok(());
        }
    };
    socket.send(Message::Text(json)).await
}
