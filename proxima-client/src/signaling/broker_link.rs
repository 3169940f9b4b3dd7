use futures::{SinkExt, StreamExt};
use proxima_core::{ClientMessage, ServerMessage};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerStatus {
    Connecting,
    Connected,
    Disconnected,
}

/// What the broker connection reports to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerEvent {
    Status(BrokerStatus),
    Message(ServerMessage),
}

enum SessionEnd {
    /// The connection dropped; try again later.
    Lost,
    /// The engine hung up.
    Shutdown,
}

/// Keeps a WebSocket session to the broker alive, reconnecting after
/// `reconnect_delay`. Ends once `outbound` is closed.
pub fn spawn_broker_link(
    url: String,
    reconnect_delay: Duration,
    mut outbound: mpsc::Receiver<ClientMessage>,
    events: mpsc::Sender<BrokerEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if events.send(BrokerEvent::Status(BrokerStatus::Connecting)).await.is_err() {
            return;
        }
        // Disconnected is reported once per outage, not once per retry.
        let mut reported_down = false;
        loop {
            match connect_async(url.as_str()).await {
                Ok((stream, _)) => {
                    info!("Connected to broker at {}", url);
                    reported_down = false;
                    // Anything queued while offline refers to a dead session.
                    while outbound.try_recv().is_ok() {}
                    if events.send(BrokerEvent::Status(BrokerStatus::Connected)).await.is_err() {
                        return;
                    }
                    let end = run_session(stream, &mut outbound, &events).await;
                    if let SessionEnd::Shutdown = end {
                        return;
                    }
                    warn!("Lost broker connection");
                }
                Err(e) if reported_down => debug!("Broker still unreachable: {}", e),
                Err(e) => warn!("Broker unreachable at {}: {}", url, e),
            }
            if !reported_down {
                reported_down = true;
                if events.send(BrokerEvent::Status(BrokerStatus::Disconnected)).await.is_err() {
                    return;
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(reconnect_delay) => {}
                _ = events.closed() => return,
            }
        }
    })
}

async fn run_session<S>(
    stream: tokio_tungstenite::WebSocketStream<S>,
    outbound: &mut mpsc::Receiver<ClientMessage>,
    events: &mpsc::Sender<BrokerEvent>,
) -> SessionEnd
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let (mut write, mut read) = stream.split();
    loop {
        tokio::select! {
            msg = outbound.recv() => {
                let Some(msg) = msg else {
                    let _ = write.send(Message::Close(None)).await;
                    return SessionEnd::Shutdown;
                };
                let text = match serde_json::to_string(&msg) {
                    Ok(text) => text,
                    Err(e) => {
                        error!("Failed to serialize {}: {}", msg.kind(), e);
                        continue;
                    }
                };
                if let Err(e) = write.send(Message::Text(text)).await {
                    warn!("Broker write failed: {}", e);
                    return SessionEnd::Lost;
                }
            }
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<ServerMessage>(&text) {
                        Ok(msg) => {
                            if events.send(BrokerEvent::Message(msg)).await.is_err() {
                                return SessionEnd::Shutdown;
                            }
                        }
                        Err(e) => warn!("Unparseable broker message: {}", e),
                    }
                }
                Some(Ok(Message::Close(_))) | None => return SessionEnd::Lost,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("Broker read failed: {}", e);
                    return SessionEnd::Lost;
                }
            },
        }
    }
}
