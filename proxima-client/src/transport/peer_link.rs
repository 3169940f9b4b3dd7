use crate::error::LinkError;
use crate::peer::Role;
use async_trait::async_trait;
use bytes::Bytes;
use proxima_core::ClientId;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEventKind {
    /// A local connectivity candidate to relay to the peer.
    CandidateGenerated(String),
    /// The data path to the peer is open.
    Connected,
    Disconnected,
    Message(Bytes),
}

/// Something a link reported, tagged with the record it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkEvent {
    pub peer: ClientId,
    pub token: u64,
    pub kind: LinkEventKind,
}

/// Where a link pushes its events. Cloned into transport callbacks.
#[derive(Debug, Clone)]
pub struct LinkEventSink {
    peer: ClientId,
    token: u64,
    tx: mpsc::Sender<LinkEvent>,
}

impl LinkEventSink {
    pub fn new(peer: ClientId, token: u64, tx: mpsc::Sender<LinkEvent>) -> Self {
        Self { peer, token, tx }
    }

    pub fn peer(&self) -> &ClientId {
        &self.peer
    }

    pub fn token(&self) -> u64 {
        self.token
    }

    /// Delivery fails only once the engine is gone.
    pub async fn emit(&self, kind: LinkEventKind) -> bool {
        let event = LinkEvent {
            peer: self.peer.clone(),
            token: self.token,
            kind,
        };
        self.tx.send(event).await.is_ok()
    }
}

/// A direct transport to one peer. Session descriptions and candidates are
/// opaque strings handed to and from the broker.
#[async_trait]
pub trait PeerLink: Send + Sync {
    async fn create_offer(&self) -> Result<String, LinkError>;

    /// Applies the remote offer and returns the local answer.
    async fn accept_offer(&self, offer: String) -> Result<String, LinkError>;

    async fn accept_answer(&self, answer: String) -> Result<(), LinkError>;

    async fn add_remote_candidate(&self, candidate: String) -> Result<(), LinkError>;

    async fn send(&self, data: Bytes) -> Result<(), LinkError>;

    async fn close(&self) -> Result<(), LinkError>;
}

#[async_trait]
pub trait PeerLinkFactory: Send + Sync {
    async fn open(
        &self,
        peer: &ClientId,
        role: Role,
        events: LinkEventSink,
    ) -> Result<Arc<dyn PeerLink>, LinkError>;
}
