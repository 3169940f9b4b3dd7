use crate::model::client::ClientId;
use crate::model::position::MapPosition;
use crate::utils::DEFAULT_CHANNEL;
use serde::{Deserialize, Serialize};

fn default_channel() -> i32 {
    DEFAULT_CHANNEL
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub client_id: ClientId,
    pub map_id: i32,
    pub x: i32,
    pub y: i32,
    #[serde(default = "default_channel")]
    pub channel: i32,
}

impl PositionUpdate {
    pub fn position(&self) -> MapPosition {
        MapPosition::new(self.map_id, self.x, self.y)
    }
}

/// Messages a client sends to the broker.
///
/// Handshake payloads are opaque to the broker and relayed verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    UpdatePosition(PositionUpdate),
    SendOffer { target_id: ClientId, offer: String },
    SendAnswer { target_id: ClientId, answer: String },
    SendIceCandidate { target_id: ClientId, candidate: String },
    RequestPeerRefresh,
    Disconnect,
}

impl ClientMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::UpdatePosition(_) => "UpdatePosition",
            ClientMessage::SendOffer { .. } => "SendOffer",
            ClientMessage::SendAnswer { .. } => "SendAnswer",
            ClientMessage::SendIceCandidate { .. } => "SendIceCandidate",
            ClientMessage::RequestPeerRefresh => "RequestPeerRefresh",
            ClientMessage::Disconnect => "Disconnect",
        }
    }
}

/// Messages the broker sends to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    /// Full list of ids currently in range, same map and channel.
    NearbyPeers(Vec<ClientId>),
    ReceiveOffer { sender_id: ClientId, offer: String },
    ReceiveAnswer { sender_id: ClientId, answer: String },
    ReceiveIceCandidate { sender_id: ClientId, candidate: String },
    Error(String),
}
