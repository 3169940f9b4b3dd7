use crate::utils::MockLinkFactory;
use proxima_client::{
    BrokerEvent, BrokerStatus, ClientConfig, ClientEngine, ClientEvent, EngineIo, LocalSample,
};
use proxima_core::{ClientId, ClientMessage, ServerMessage};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;

pub fn id(s: &str) -> ClientId {
    ClientId::from(s)
}

pub fn sample(map_id: i32, x: i32, y: i32) -> LocalSample {
    LocalSample {
        map_id,
        x,
        y,
        character_name: "Tester".to_string(),
    }
}

pub fn test_config(local: &str) -> ClientConfig {
    ClientConfig {
        client_id: id(local),
        ..ClientConfig::default()
    }
}

/// Drives one engine with a scripted broker instead of a socket.
pub struct EngineHarness {
    pub factory: MockLinkFactory,
    broker_tx: mpsc::Sender<BrokerEvent>,
    outbound_rx: mpsc::Receiver<ClientMessage>,
    samples_tx: mpsc::Sender<LocalSample>,
    events_rx: mpsc::UnboundedReceiver<ClientEvent>,
    shutdown: Arc<Notify>,
    task: JoinHandle<()>,
}

impl EngineHarness {
    pub fn start(local: &str) -> Self {
        Self::start_with(test_config(local), MockLinkFactory::new(local))
    }

    pub fn start_with(config: ClientConfig, factory: MockLinkFactory) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::channel(64);
        let (broker_tx, broker_rx) = mpsc::channel(64);
        let (samples_tx, samples_rx) = mpsc::channel(16);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let shutdown = Arc::new(Notify::new());

        let io = EngineIo {
            outbound: outbound_tx,
            broker: broker_rx,
            samples: samples_rx,
            events: events_tx,
            shutdown: shutdown.clone(),
        };
        let engine = ClientEngine::new(config, Arc::new(factory.clone()), io);
        let task = tokio::spawn(engine.run());

        Self {
            factory,
            broker_tx,
            outbound_rx,
            samples_tx,
            events_rx,
            shutdown,
            task,
        }
    }

    /// Lets the engine work through everything queued. Needs a paused clock.
    pub async fn settle(&self) {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    pub async fn status(&self, status: BrokerStatus) {
        self.broker_tx.send(BrokerEvent::Status(status)).await.unwrap();
        self.settle().await;
    }

    pub async fn deliver(&self, msg: ServerMessage) {
        self.broker_tx.send(BrokerEvent::Message(msg)).await.unwrap();
        self.settle().await;
    }

    pub async fn nearby(&self, peers: &[&str]) {
        self.deliver(ServerMessage::NearbyPeers(peers.iter().map(|p| id(p)).collect()))
            .await;
    }

    pub async fn feed(&self, sample: LocalSample) {
        self.samples_tx.send(sample).await.unwrap();
        self.settle().await;
    }

    /// Everything the engine sent to the broker so far.
    pub fn outbound(&mut self) -> Vec<ClientMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = self.outbound_rx.try_recv() {
            out.push(msg);
        }
        out
    }

    pub fn events(&mut self) -> Vec<ClientEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.events_rx.try_recv() {
            out.push(event);
        }
        out
    }

    pub async fn stop(mut self) -> Vec<ClientMessage> {
        self.shutdown.notify_one();
        let _ = (&mut self.task).await;
        self.outbound()
    }
}

pub fn offers_to(messages: &[ClientMessage]) -> Vec<String> {
    messages
        .iter()
        .filter_map(|msg| match msg {
            ClientMessage::SendOffer { target_id, .. } => Some(target_id.to_string()),
            _ => None,
        })
        .collect()
}

pub fn refresh_count(messages: &[ClientMessage]) -> usize {
    messages
        .iter()
        .filter(|msg| **msg == ClientMessage::RequestPeerRefresh)
        .count()
}

pub fn gone(events: &[ClientEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            ClientEvent::PeerGone(peer) => Some(peer.to_string()),
            _ => None,
        })
        .collect()
}
