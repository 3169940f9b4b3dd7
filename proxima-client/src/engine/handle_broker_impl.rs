use crate::engine::{ClientEngine, ClientEvent};
use crate::signaling::{BrokerEvent, BrokerStatus};
use proxima_core::{ClientMessage, ServerMessage};
use tokio::time::Instant;
use tracing::{debug, info, warn};

impl ClientEngine {
    pub(crate) async fn handle_broker_event(&mut self, event: BrokerEvent) {
        match event {
            BrokerEvent::Status(status) => self.handle_status(status).await,
            BrokerEvent::Message(msg) => self.handle_server_message(msg).await,
        }
    }

    async fn handle_status(&mut self, status: BrokerStatus) {
        match status {
            BrokerStatus::Connecting => {}
            BrokerStatus::Connected => {
                info!("Broker session up");
                self.broker_connected = true;
                self.reporter.reset();
                if let Some(position) = self.reporter.keepalive(Instant::now()) {
                    self.report(position);
                    // the broker may still hold the list it sent the previous session
                    self.to_broker(ClientMessage::RequestPeerRefresh);
                }
            }
            BrokerStatus::Disconnected => {
                if self.broker_connected {
                    warn!("Broker session down, dropping {} peers", self.manager.len());
                }
                self.broker_connected = false;
                let actions = self.manager.teardown_all();
                self.apply(actions).await;
            }
        }
        self.emit(ClientEvent::Status(status));
    }

    async fn handle_server_message(&mut self, msg: ServerMessage) {
        let now = Instant::now();
        let actions = match msg {
            ServerMessage::NearbyPeers(peers) => {
                debug!("Nearby: {:?}", peers);
                self.manager.on_nearby_peers(&peers, now)
            }
            ServerMessage::ReceiveOffer { sender_id, offer } => {
                self.manager.on_offer(&sender_id, offer, now)
            }
            ServerMessage::ReceiveAnswer { sender_id, answer } => {
                self.manager.on_answer(&sender_id, answer, now)
            }
            ServerMessage::ReceiveIceCandidate {
                sender_id,
                candidate,
            } => self.manager.on_candidate(&sender_id, candidate, now),
            ServerMessage::Error(text) => {
                warn!("Broker error: {}", text);
                self.emit(ClientEvent::BrokerError(text));
                Vec::new()
            }
        };
        self.apply(actions).await;
    }
}
