use crate::error::DeliveryError;
use crate::signaling::SignalingOutput;
use async_trait::async_trait;
use dashmap::DashMap;
use proxima_core::{ClientId, ServerMessage};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Notify, mpsc};
use tracing::{debug, warn};
use uuid::Uuid;

/// Outbound side of one live WebSocket connection.
#[derive(Clone)]
pub struct ConnectionHandle {
    pub connection_id: Uuid,
    tx: mpsc::Sender<ServerMessage>,
    closer: Arc<Notify>,
    nearby_revision: Arc<AtomicU64>,
    evicted: Arc<AtomicBool>,
}

impl ConnectionHandle {
    pub fn new(connection_id: Uuid, tx: mpsc::Sender<ServerMessage>, closer: Arc<Notify>) -> Self {
        Self {
            connection_id,
            tx,
            closer,
            nearby_revision: Arc::new(AtomicU64::new(0)),
            evicted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Records `revision` as delivered; false if a newer list already went out.
    fn claim_revision(&self, revision: u64) -> bool {
        self.nearby_revision.fetch_max(revision, Ordering::AcqRel) < revision
    }

    /// Queues `msg` without waiting for room in the outbox.
    pub fn push(&self, msg: ServerMessage) -> Result<(), TrySendError<ServerMessage>> {
        self.tx.try_send(msg)
    }

    /// Asks the connection's socket loop to shut down.
    pub fn close(&self) {
        self.closer.notify_one();
    }

    /// True once the broker dropped this connection for going silent.
    pub fn is_evicted(&self) -> bool {
        self.evicted.load(Ordering::Acquire)
    }
}

/// Routes messages to registered clients by id.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    peers: Arc<DashMap<ClientId, ConnectionHandle>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `client_id` to a connection, returning the connection it replaced.
    pub fn register(&self, client_id: ClientId, handle: ConnectionHandle) -> Option<Uuid> {
        self.peers
            .insert(client_id, handle)
            .map(|previous| previous.connection_id)
    }

    /// Unbinds `client_id` only if it still points at `connection_id`.
    pub fn unregister(&self, client_id: &ClientId, connection_id: Uuid) -> bool {
        self.peers
            .remove_if(client_id, |_, handle| handle.connection_id == connection_id)
            .is_some()
    }

    /// Unbinds `client_id` and closes its connection.
    pub fn evict(&self, client_id: &ClientId) {
        if let Some((_, handle)) = self.peers.remove(client_id) {
            handle.evicted.store(true, Ordering::Release);
            handle.close();
        }
    }

    pub fn contains(&self, client_id: &ClientId) -> bool {
        self.peers.contains_key(client_id)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn deliver(&self, client_id: &ClientId, msg: ServerMessage) -> Result<(), DeliveryError> {
        let handle = self.handle_of(client_id)?;
        Self::push_to(&handle, client_id, msg)
    }

    fn handle_of(&self, client_id: &ClientId) -> Result<ConnectionHandle, DeliveryError> {
        // clone the handle so the map shard is not held while sending
        self.peers
            .get(client_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| DeliveryError::Unknown(client_id.clone()))
    }

    fn push_to(
        handle: &ConnectionHandle,
        client_id: &ClientId,
        msg: ServerMessage,
    ) -> Result<(), DeliveryError> {
        handle.push(msg).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::Saturated(client_id.clone()),
            TrySendError::Closed(_) => DeliveryError::Closed(client_id.clone()),
        })
    }
}

#[async_trait]
impl SignalingOutput for ConnectionRegistry {
    async fn send_nearby(&self, client_id: ClientId, peers: Vec<ClientId>, revision: u64) {
        let result = self.handle_of(&client_id).and_then(|handle| {
            if !handle.claim_revision(revision) {
                debug!("Superseded nearby list for {} dropped", client_id);
                return Ok(());
            }
            Self::push_to(&handle, &client_id, ServerMessage::NearbyPeers(peers))
        });

        match result {
            Ok(()) => {}
            Err(DeliveryError::Unknown(_)) => {
                debug!("Nearby list for {} dropped, not connected", client_id)
            }
            Err(e) => warn!("Failed to queue nearby list: {}", e),
        }
    }
}
