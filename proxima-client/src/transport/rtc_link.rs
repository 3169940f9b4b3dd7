use crate::error::LinkError;
use crate::peer::Role;
use crate::transport::peer_link::{LinkEventKind, LinkEventSink, PeerLink, PeerLinkFactory};
use async_trait::async_trait;
use bytes::Bytes;
use proxima_core::ClientId;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::data_channel::RTCDataChannel;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;

const DATA_CHANNEL_LABEL: &str = "proximity";

type ChannelSlot = Arc<Mutex<Option<Arc<RTCDataChannel>>>>;

/// Opens `webrtc` peer connections carrying one data channel.
pub struct RtcLinkFactory {
    ice_servers: Vec<String>,
}

impl RtcLinkFactory {
    pub fn new(ice_servers: Vec<String>) -> Self {
        Self { ice_servers }
    }
}

#[async_trait]
impl PeerLinkFactory for RtcLinkFactory {
    async fn open(
        &self,
        peer: &ClientId,
        role: Role,
        events: LinkEventSink,
    ) -> Result<Arc<dyn PeerLink>, LinkError> {
        let link = RtcLink::new(peer.clone(), role, self.ice_servers.clone(), events).await?;
        Ok(Arc::new(link))
    }
}

pub struct RtcLink {
    peer: ClientId,
    peer_connection: Arc<RTCPeerConnection>,
    channel: ChannelSlot,
}

impl RtcLink {
    pub async fn new(
        peer: ClientId,
        role: Role,
        ice_servers: Vec<String>,
        events: LinkEventSink,
    ) -> Result<Self, LinkError> {
        let mut media = MediaEngine::default();
        media.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut media)?;
        let api = APIBuilder::new()
            .with_media_engine(media)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: vec![RTCIceServer {
                urls: ice_servers,
                ..Default::default()
            }],
            ..Default::default()
        };
        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);
        let channel: ChannelSlot = Arc::new(Mutex::new(None));

        let state_sink = events.clone();
        peer_connection.on_peer_connection_state_change(Box::new(move |s: RTCPeerConnectionState| {
            let sink = state_sink.clone();
            Box::pin(async move {
                debug!("Peer connection to {} is {:?}", sink.peer(), s);
                if matches!(
                    s,
                    RTCPeerConnectionState::Failed
                        | RTCPeerConnectionState::Disconnected
                        | RTCPeerConnectionState::Closed
                ) {
                    sink.emit(LinkEventKind::Disconnected).await;
                }
            })
        }));

        let ice_sink = events.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let sink = ice_sink.clone();
            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else { return };
                let Ok(text) = serde_json::to_string(&init) else { return };
                sink.emit(LinkEventKind::CandidateGenerated(text)).await;
            })
        }));

        match role {
            Role::Initiator => {
                let dc = peer_connection.create_data_channel(DATA_CHANNEL_LABEL, None).await?;
                wire_channel(&dc, events.clone());
                *channel.lock().await = Some(dc);
            }
            Role::Responder => {
                let slot = channel.clone();
                let dc_sink = events.clone();
                peer_connection.on_data_channel(Box::new(move |dc: Arc<RTCDataChannel>| {
                    let slot = slot.clone();
                    let sink = dc_sink.clone();
                    Box::pin(async move {
                        debug!("Data channel '{}' from {}", dc.label(), sink.peer());
                        wire_channel(&dc, sink);
                        *slot.lock().await = Some(dc);
                    })
                }));
            }
        }

        Ok(Self {
            peer,
            peer_connection,
            channel,
        })
    }

    async fn set_remote(&self, payload: &str, expected: RTCSdpType) -> Result<(), LinkError> {
        let desc: RTCSessionDescription = serde_json::from_str(payload)?;
        if desc.sdp_type != expected {
            return Err(LinkError::Negotiation(format!(
                "expected {} from {}, got {}",
                expected, self.peer, desc.sdp_type
            )));
        }
        self.peer_connection.set_remote_description(desc).await?;
        Ok(())
    }
}

fn wire_channel(dc: &Arc<RTCDataChannel>, sink: LinkEventSink) {
    let open_sink = sink.clone();
    dc.on_open(Box::new(move || {
        let sink = open_sink.clone();
        Box::pin(async move {
            info!("Data channel to {} open", sink.peer());
            sink.emit(LinkEventKind::Connected).await;
        })
    }));

    let msg_sink = sink;
    dc.on_message(Box::new(move |msg: DataChannelMessage| {
        let sink = msg_sink.clone();
        Box::pin(async move {
            sink.emit(LinkEventKind::Message(msg.data)).await;
        })
    }));
}

#[async_trait]
impl PeerLink for RtcLink {
    async fn create_offer(&self) -> Result<String, LinkError> {
        let offer = self.peer_connection.create_offer(None).await?;
        self.peer_connection.set_local_description(offer.clone()).await?;
        Ok(serde_json::to_string(&offer)?)
    }

    async fn accept_offer(&self, offer: String) -> Result<String, LinkError> {
        self.set_remote(&offer, RTCSdpType::Offer).await?;
        let answer = self.peer_connection.create_answer(None).await?;
        self.peer_connection.set_local_description(answer.clone()).await?;
        Ok(serde_json::to_string(&answer)?)
    }

    async fn accept_answer(&self, answer: String) -> Result<(), LinkError> {
        self.set_remote(&answer, RTCSdpType::Answer).await
    }

    async fn add_remote_candidate(&self, candidate: String) -> Result<(), LinkError> {
        let init: RTCIceCandidateInit = serde_json::from_str(&candidate)?;
        self.peer_connection.add_ice_candidate(init).await?;
        Ok(())
    }

    async fn send(&self, data: Bytes) -> Result<(), LinkError> {
        let channel = self.channel.lock().await.clone();
        let Some(dc) = channel else {
            return Err(LinkError::Closed);
        };
        dc.send(&data).await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), LinkError> {
        self.peer_connection.close().await?;
        Ok(())
    }
}
