//! WebSocket connection handling
//!
//! One task pair per socket: the writer drains the player's outbox into text
//! frames, the reader parses frames and forwards them to the arena engine.
//! The reader waits whenever the engine's command queue is full, so a busy
//! engine slows socket reads instead of buffering them.

use crate::connection::OUTBOX_CAPACITY;
use crate::protocol::{MessageUtils, ServerEvent};
use crate::service::engine::ArenaHandle;
use crate::transport::router::ServerState;
use crate::utils::generate_connection_id;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<ServerState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state.handle))
}

async fn handle_socket(socket: WebSocket, handle: ArenaHandle) {
    let player_id = generate_connection_id();
    let (outbox, inbox) = mpsc::channel::<ServerEvent>(OUTBOX_CAPACITY);

    if let Err(e) = handle.connect(&player_id, outbox).await {
        warn!("Rejecting socket '{}': {}", player_id, e);
        return;
    }

    let (mut sink, mut stream) = socket.split();

    let writer_id = player_id.clone();
    let mut writer = tokio::spawn(async move {
        let mut events = ReceiverStream::new(inbox);
        while let Some(event) = events.next().await {
            let text = match MessageUtils::serialize_event(&event) {
                Ok(text) => text,
                Err(e) => {
                    warn!("Dropping '{}' event for '{}': {}", event.kind(), writer_id, e);
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                debug!("Socket for '{}' closed while writing", writer_id);
                break;
            }
        }
        let _ = sink.close().await;
    });

    let reader_id = player_id.clone();
    let reader_handle = handle.clone();
    let mut reader = tokio::spawn(async move {
        while let Some(frame) = stream.next().await {
            let text = match frame {
                Ok(Message::Text(text)) => text,
                Ok(Message::Close(_)) => break,
                Ok(Message::Binary(_)) => {
                    warn!("Binary frame from '{}' ignored", reader_id);
                    continue;
                }
                Ok(_) => continue,
                Err(e) => {
                    debug!("Socket read error for '{}': {}", reader_id, e);
                    break;
                }
            };

            match MessageUtils::parse_client_message(text.as_str()) {
                Ok(message) => {
                    debug!("'{}' -> {}", reader_id, message.kind());
                    if reader_handle.dispatch(&reader_id, message).await.is_err() {
                        break;
                    }
                }
                Err(e) => warn!("Malformed frame from '{}': {}", reader_id, e),
            }
        }
    });

    // either side finishing ends the connection
    tokio::select! {
        _ = &mut writer => reader.abort(),
        _ = &mut reader => writer.abort(),
    }

    if let Err(e) = handle.disconnect(&player_id).await {
        debug!("Disconnect for '{}' not delivered: {}", player_id, e);
    }
    info!("Socket for '{}' closed", player_id);
}
