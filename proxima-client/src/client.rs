use crate::config::ClientConfig;
use crate::engine::{ClientEngine, ClientEvent, EngineIo};
use crate::reporter::LocalSample;
use crate::signaling::spawn_broker_link;
use crate::transport::{PeerLinkFactory, RtcLinkFactory};
use std::sync::Arc;
use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;

const OUTBOUND_CAPACITY: usize = 64;
const BROKER_EVENT_CAPACITY: usize = 64;
const SAMPLE_CAPACITY: usize = 32;

/// A running client: feed it samples, read its events, shut it down.
pub struct ClientHandle {
    samples: mpsc::Sender<LocalSample>,
    events: mpsc::UnboundedReceiver<ClientEvent>,
    shutdown: Arc<Notify>,
    engine: JoinHandle<()>,
    broker: JoinHandle<()>,
}

impl ClientHandle {
    pub fn samples(&self) -> mpsc::Sender<LocalSample> {
        self.samples.clone()
    }

    pub async fn next_event(&mut self) -> Option<ClientEvent> {
        self.events.recv().await
    }

    /// Tears down every peer, says goodbye to the broker and waits for both
    /// tasks to finish.
    pub async fn shutdown(self) {
        self.shutdown.notify_one();
        let _ = self.engine.await;
        let _ = self.broker.await;
    }
}

/// Starts a client with `webrtc` peer links.
pub fn spawn_client(config: ClientConfig) -> ClientHandle {
    let factory = Arc::new(RtcLinkFactory::new(config.ice_servers.clone()));
    spawn_client_with(config, factory)
}

pub fn spawn_client_with(config: ClientConfig, factory: Arc<dyn PeerLinkFactory>) -> ClientHandle {
    let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);
    let (broker_tx, broker_rx) = mpsc::channel(BROKER_EVENT_CAPACITY);
    let (samples_tx, samples_rx) = mpsc::channel(SAMPLE_CAPACITY);
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let shutdown = Arc::new(Notify::new());

    let broker = spawn_broker_link(
        config.broker_url.clone(),
        config.reconnect_delay,
        outbound_rx,
        broker_tx,
    );
    let io = EngineIo {
        outbound: outbound_tx,
        broker: broker_rx,
        samples: samples_rx,
        events: events_tx,
        shutdown: shutdown.clone(),
    };
    let engine = tokio::spawn(ClientEngine::new(config, factory, io).run());

    ClientHandle {
        samples: samples_tx,
        events: events_rx,
        shutdown,
        engine,
        broker,
    }
}
