use crate::signaling::ConnectionHandle;
use proxima_core::{ClientId, ServerMessage};
use std::sync::Arc;
use tokio::sync::{Notify, mpsc};
use tracing::warn;
use uuid::Uuid;

/// State of one WebSocket connection as seen by the relay.
pub struct Session {
    handle: ConnectionHandle,
    closer: Arc<Notify>,
    client_id: Option<ClientId>,
}

impl Session {
    pub(crate) fn new(capacity: usize) -> (Self, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(capacity);
        let closer = Arc::new(Notify::new());
        let handle = ConnectionHandle::new(Uuid::new_v4(), tx, closer.clone());
        (
            Self {
                handle,
                closer,
                client_id: None,
            },
            rx,
        )
    }

    pub fn connection_id(&self) -> Uuid {
        self.handle.connection_id
    }

    /// Id this connection registered with, once it sent a position.
    pub fn client_id(&self) -> Option<&ClientId> {
        self.client_id.as_ref()
    }

    /// Resolves when the broker wants this connection closed.
    pub fn closer(&self) -> Arc<Notify> {
        self.closer.clone()
    }

    pub fn is_evicted(&self) -> bool {
        self.handle.is_evicted()
    }

    pub(crate) fn handle(&self) -> ConnectionHandle {
        self.handle.clone()
    }

    pub(crate) fn bind(&mut self, client_id: ClientId) {
        self.client_id = Some(client_id);
    }

    /// Best-effort reply on this connection's own channel.
    pub(crate) fn reply(&self, msg: ServerMessage) {
        if let Err(e) = self.handle.push(msg) {
            warn!("Reply on {} dropped: {}", self.connection_id(), e);
        }
    }
}
