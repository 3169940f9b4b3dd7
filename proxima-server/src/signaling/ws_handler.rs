use crate::signaling::{Flow, SignalingRelay};
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tracing::{error, info, warn};

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(relay): State<SignalingRelay>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, relay))
}

async fn handle_socket(socket: WebSocket, relay: SignalingRelay) {
    let (mut sender, mut receiver) = socket.split();
    let (mut session, mut rx) = relay.open_session();
    let connection_id = session.connection_id();
    let closer = session.closer();

    info!("New WebSocket connection: {}", connection_id);

    // outbound messages for this client are written by this task only
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(json) => {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        error!("Failed to send message to {}: WebSocket send error", connection_id);
                        break;
                    }
                }
                Err(e) => error!("Failed to serialize ServerMessage for {}: {}", connection_id, e),
            }
        }
        let _ = sender.close().await;
    });

    loop {
        tokio::select! {
            _ = &mut send_task => break,
            _ = closer.notified() => {
                info!("Connection {} closed by broker", connection_id);
                break;
            }
            frame = receiver.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if relay.handle_text(&mut session, text.as_str()).await == Flow::Close {
                        break;
                    }
                }
                Some(Ok(Message::Binary(_))) => {
                    warn!("Received unexpected binary message on {}", connection_id);
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("WebSocket error on {}: {}", connection_id, e);
                    break;
                }
            },
        }
    }

    send_task.abort();
    relay.close_session(session).await;
    info!("WebSocket disconnected: {}", connection_id);
}
