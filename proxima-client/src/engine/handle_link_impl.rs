use crate::engine::{ClientEngine, ClientEvent};
use crate::transport::{LinkEvent, LinkEventKind};
use bytes::Bytes;
use proxima_core::{ClientId, ClientMessage, PeerPacket, PeerPosition};
use tokio::time::Instant;
use tracing::debug;

impl ClientEngine {
    pub(crate) async fn handle_link_event(&mut self, event: LinkEvent) {
        let LinkEvent { peer, token, kind } = event;
        if self.manager.token_of(&peer) != Some(token) {
            debug!("Ignoring {:?} from a retired link to {}", kind, peer);
            return;
        }

        let actions = match kind {
            LinkEventKind::CandidateGenerated(candidate) => {
                self.to_broker(ClientMessage::SendIceCandidate {
                    target_id: peer,
                    candidate,
                });
                return;
            }
            LinkEventKind::Connected => self.manager.on_connected(&peer, token, Instant::now()),
            LinkEventKind::Disconnected => self.manager.on_link_lost(&peer, token),
            LinkEventKind::Message(data) => {
                self.handle_peer_packet(peer, data);
                return;
            }
        };
        self.apply(actions).await;
    }

    fn handle_peer_packet(&mut self, peer: ClientId, data: Bytes) {
        let packet = match PeerPacket::decode(&data) {
            Ok(packet) => packet,
            Err(e) => {
                debug!("Unreadable packet from {}: {}", peer, e);
                return;
            }
        };
        match packet {
            PeerPacket::Position(position) => self.update_peer_position(peer, position),
        }
    }

    /// Positions from peers without a live connection are dropped.
    fn update_peer_position(&mut self, peer: ClientId, position: PeerPosition) {
        if !self.manager.is_connected(&peer) {
            return;
        }
        self.peer_positions.insert(peer.clone(), position);
        self.emit_gain(&peer);
    }

    pub(crate) fn emit_gain(&self, peer: &ClientId) {
        let (Some(local), Some(remote)) = (self.local.as_ref(), self.peer_positions.get(peer))
        else {
            return;
        };
        let gain = self.attenuator.gain(&local.position(), &remote.position());
        self.emit(ClientEvent::PeerGain {
            peer: peer.clone(),
            gain,
            character_name: remote.character_name.to_string(),
        });
    }
}
