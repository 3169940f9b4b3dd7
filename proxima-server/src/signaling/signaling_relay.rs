use crate::broker::Broker;
use crate::config::BrokerConfig;
use crate::error::{DeliveryError, RelayError};
use crate::signaling::{ConnectionRegistry, Session};
use proxima_core::{ClientId, ClientMessage, PositionUpdate, ServerMessage};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// What the socket loop should do after a message was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Close,
}

/// Demultiplexes client messages: positions go to the [`Broker`], handshake
/// payloads are forwarded untouched to their target connection.
#[derive(Clone)]
pub struct SignalingRelay {
    registry: ConnectionRegistry,
    broker: Arc<Broker>,
    config: Arc<BrokerConfig>,
}

impl SignalingRelay {
    pub fn new(config: BrokerConfig) -> Self {
        let registry = ConnectionRegistry::new();
        let broker = Arc::new(Broker::new(config.range, Arc::new(registry.clone())));
        Self {
            registry,
            broker,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    pub fn broker(&self) -> &Arc<Broker> {
        &self.broker
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Creates an anonymous session and the receiving end of its outbox.
    pub fn open_session(&self) -> (Session, mpsc::Receiver<ServerMessage>) {
        let (session, rx) = Session::new(self.config.outbox_capacity);
        debug!("Session opened: {}", session.connection_id());
        (session, rx)
    }

    /// Parses one text frame. Malformed input is reported to the sender and
    /// otherwise ignored.
    pub async fn handle_text(&self, session: &mut Session, text: &str) -> Flow {
        match serde_json::from_str::<ClientMessage>(text) {
            Ok(msg) => self.handle_message(session, msg).await,
            Err(e) => {
                warn!(
                    "Failed to parse message on {}: {}. Message: '{}'",
                    session.connection_id(),
                    e,
                    text
                );
                session.reply(ServerMessage::Error(
                    RelayError::Malformed(e.to_string()).to_string(),
                ));
                Flow::Continue
            }
        }
    }

    pub async fn handle_message(&self, session: &mut Session, msg: ClientMessage) -> Flow {
        let msg = match msg {
            ClientMessage::UpdatePosition(update) => {
                if let Err(e) = self.update_position(session, update).await {
                    warn!("Rejected position on {}: {}", session.connection_id(), e);
                    session.reply(ServerMessage::Error(e.to_string()));
                }
                return Flow::Continue;
            }
            other => other,
        };

        let Some(sender_id) = session.client_id().cloned() else {
            warn!(
                "Received {} from unregistered connection {}",
                msg.kind(),
                session.connection_id()
            );
            session.reply(ServerMessage::Error(RelayError::NotRegistered.to_string()));
            return Flow::Continue;
        };

        let forwarded = match msg {
            ClientMessage::UpdatePosition(_) => return Flow::Continue,
            ClientMessage::SendOffer { target_id, offer } => (
                target_id,
                ServerMessage::ReceiveOffer {
                    sender_id: sender_id.clone(),
                    offer,
                },
            ),
            ClientMessage::SendAnswer { target_id, answer } => (
                target_id,
                ServerMessage::ReceiveAnswer {
                    sender_id: sender_id.clone(),
                    answer,
                },
            ),
            ClientMessage::SendIceCandidate {
                target_id,
                candidate,
            } => (
                target_id,
                ServerMessage::ReceiveIceCandidate {
                    sender_id: sender_id.clone(),
                    candidate,
                },
            ),
            ClientMessage::RequestPeerRefresh => {
                debug!("Refresh requested by {}", sender_id);
                self.broker.request_refresh(&sender_id).await;
                return Flow::Continue;
            }
            ClientMessage::Disconnect => {
                info!("Received Disconnect from {}", sender_id);
                return Flow::Close;
            }
        };

        let (target_id, payload) = forwarded;
        if let Err(e) = self.forward(&sender_id, &target_id, payload) {
            session.reply(ServerMessage::Error(e.to_string()));
        }
        Flow::Continue
    }

    /// Cleans up after the socket closed, for whatever reason.
    pub async fn close_session(&self, session: Session) {
        let Some(client_id) = session.client_id() else {
            info!(
                "Unregistered connection closed: {}",
                session.connection_id()
            );
            return;
        };

        if self.registry.unregister(client_id, session.connection_id()) {
            self.broker.depart(client_id).await;
            info!(
                "Client disconnected and cleaned up: {} (connection {})",
                client_id,
                session.connection_id()
            );
        } else if session.is_evicted()
            && !self.registry.contains(client_id)
            && self.broker.is_tracked(client_id).await
        {
            // a position raced the sweep and put the evicted client back
            self.broker.depart(client_id).await;
            info!(
                "Evicted client {} removed again after a late update",
                client_id
            );
        } else {
            debug!(
                "Connection {} for {} was already replaced or evicted",
                session.connection_id(),
                client_id
            );
        }
    }

    /// Drops clients that stopped reporting and closes their connections.
    pub async fn sweep(&self) -> Vec<ClientId> {
        let expired = self.broker.expire_stale(self.config.stale_timeout).await;
        for id in &expired {
            warn!("Disconnecting timed out client: {}", id);
            self.registry.evict(id);
        }
        expired
    }

    async fn update_position(
        &self,
        session: &mut Session,
        update: PositionUpdate,
    ) -> Result<(), RelayError> {
        if session.is_evicted() {
            debug!(
                "Ignoring position on evicted connection {}",
                session.connection_id()
            );
            return Ok(());
        }

        match session.client_id() {
            None => {
                let client_id = update.client_id.clone();
                let replaced = self.registry.register(client_id.clone(), session.handle());
                info!(
                    "Client registered: {} on connection {}",
                    client_id,
                    session.connection_id()
                );
                session.bind(client_id);

                if let Some(previous) = replaced {
                    warn!(
                        "Client {} already registered to connection {}. Re-registered to {}",
                        update.client_id,
                        previous,
                        session.connection_id()
                    );
                    self.broker.rejoin(&update).await;
                    return Ok(());
                }
            }
            Some(registered) if *registered != update.client_id => {
                return Err(RelayError::ConflictingId {
                    registered: registered.clone(),
                    claimed: update.client_id,
                });
            }
            Some(_) => {}
        }

        self.broker.update_position(&update).await;
        Ok(())
    }

    fn forward(
        &self,
        sender_id: &ClientId,
        target_id: &ClientId,
        msg: ServerMessage,
    ) -> Result<(), RelayError> {
        match self.registry.deliver(target_id, msg) {
            Ok(()) => Ok(()),
            Err(DeliveryError::Unknown(_)) | Err(DeliveryError::Closed(_)) => {
                error!(
                    "Target client {} not found for message from {}",
                    target_id, sender_id
                );
                Err(RelayError::UnknownTarget(target_id.clone()))
            }
            Err(e @ DeliveryError::Saturated(_)) => {
                warn!("Dropped relay from {}: {}", sender_id, e);
                Ok(())
            }
        }
    }
}
