use crate::engine::ClientEngine;
use crate::reporter::LocalSample;
use proxima_core::{
    ClientId, ClientMessage, MapPosition, PeerPacket, PeerPosition, PositionUpdate,
};
use tokio::time::Instant;
use tracing::{debug, warn};

impl ClientEngine {
    pub(crate) async fn handle_sample(&mut self, sample: LocalSample) {
        let moved = self.local.as_ref() != Some(&sample);
        let position = sample.position();
        self.local = Some(sample);

        if let Some(position) = self.reporter.observe(position, Instant::now()) {
            self.report(position);
        }
        if !moved {
            return;
        }

        let peers = self.manager.connected_peers();
        for peer in &peers {
            self.send_position_to(peer).await;
            self.emit_gain(peer);
        }
    }

    pub(crate) fn handle_keepalive(&mut self) {
        if !self.broker_connected {
            return;
        }
        if let Some(position) = self.reporter.keepalive(Instant::now()) {
            self.report(position);
        }
    }

    pub(crate) async fn send_position_to(&self, peer: &ClientId) {
        let Some(local) = self.local.as_ref() else {
            return;
        };
        let Some(link) = self.links.get(peer) else {
            return;
        };
        let packet =
            PeerPacket::Position(PeerPosition::new(local.position(), &local.character_name));
        let data = match packet.encode() {
            Ok(data) => data,
            Err(e) => {
                warn!("Failed to encode position packet: {}", e);
                return;
            }
        };
        if let Err(e) = link.send(data).await {
            debug!("Position to {} not sent: {}", peer, e);
        }
    }

    pub(crate) fn report(&self, position: MapPosition) {
        if !self.broker_connected {
            return;
        }
        self.to_broker(ClientMessage::UpdatePosition(PositionUpdate {
            client_id: self.config.client_id.clone(),
            map_id: position.map_id,
            x: position.x,
            y: position.y,
            channel: self.config.channel,
        }));
    }
}
