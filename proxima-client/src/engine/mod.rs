use crate::attenuator::DistanceAttenuator;
use crate::config::ClientConfig;
use crate::peer::PeerConnectionManager;
use crate::reporter::{LocalSample, PositionReporter};
use crate::signaling::{BrokerEvent, BrokerStatus};
use crate::transport::{LinkEvent, PeerLink, PeerLinkFactory};
use proxima_core::{ClientId, ClientMessage, PeerPosition};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

mod apply_actions_impl;
mod handle_broker_impl;
mod handle_link_impl;
mod local_position_impl;

const LINK_EVENT_CAPACITY: usize = 256;
const KEEPALIVE_TICK: Duration = Duration::from_millis(500);

/// What the engine reports to the embedding application.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Status(BrokerStatus),
    PeerConnected(ClientId),
    PeerGone(ClientId),
    /// Output gain for a connected peer after either side moved.
    PeerGain {
        peer: ClientId,
        gain: f32,
        character_name: String,
    },
    BrokerError(String),
}

/// Channels tying the engine to the broker connection and the application.
pub struct EngineIo {
    pub outbound: mpsc::Sender<ClientMessage>,
    pub broker: mpsc::Receiver<BrokerEvent>,
    pub samples: mpsc::Receiver<LocalSample>,
    pub events: mpsc::UnboundedSender<ClientEvent>,
    pub shutdown: Arc<Notify>,
}

#[derive(Debug)]
enum TimerEvent {
    AttemptDue { peer: ClientId, token: u64 },
    WatchdogFired { peer: ClientId, token: u64 },
}

/// A scheduled callback and the record token it was armed for.
struct Timer {
    token: u64,
    task: JoinHandle<()>,
}

/// Single dispatch sequence for one client.
///
/// Broker messages, link events, local samples and timer expiries are all
/// funnelled through [`ClientEngine::run`], so the peer manager is only ever
/// touched from one task.
pub struct ClientEngine {
    config: ClientConfig,
    manager: PeerConnectionManager,
    reporter: PositionReporter,
    attenuator: DistanceAttenuator,
    factory: Arc<dyn PeerLinkFactory>,
    io: EngineIo,
    broker_connected: bool,
    local: Option<LocalSample>,

    links: HashMap<ClientId, Arc<dyn PeerLink>>,
    /// Links whose remote description is applied and can take candidates.
    described: HashSet<ClientId>,
    pending_candidates: HashMap<ClientId, Vec<String>>,
    peer_positions: HashMap<ClientId, PeerPosition>,

    attempts: HashMap<ClientId, Timer>,
    watchdogs: HashMap<ClientId, Timer>,
    timer_tx: mpsc::UnboundedSender<TimerEvent>,
    timer_rx: mpsc::UnboundedReceiver<TimerEvent>,
    link_tx: mpsc::Sender<LinkEvent>,
    link_rx: mpsc::Receiver<LinkEvent>,
}

impl ClientEngine {
    pub fn new(config: ClientConfig, factory: Arc<dyn PeerLinkFactory>, io: EngineIo) -> Self {
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        let (link_tx, link_rx) = mpsc::channel(LINK_EVENT_CAPACITY);

        Self {
            manager: PeerConnectionManager::new(
                config.client_id.clone(),
                config.handshake_timeout,
                config.attempt_stagger,
            ),
            reporter: PositionReporter::new(config.force_interval),
            attenuator: DistanceAttenuator::new(config.range, config.full_volume_radius),
            config,
            factory,
            io,
            broker_connected: false,
            local: None,
            links: HashMap::new(),
            described: HashSet::new(),
            pending_candidates: HashMap::new(),
            peer_positions: HashMap::new(),
            attempts: HashMap::new(),
            watchdogs: HashMap::new(),
            timer_tx,
            timer_rx,
            link_tx,
            link_rx,
        }
    }

    pub async fn run(mut self) {
        info!("Client engine started as {}", self.config.client_id);
        let mut keepalive = tokio::time::interval(KEEPALIVE_TICK);
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let shutdown = self.io.shutdown.clone();

        loop {
            tokio::select! {
                _ = shutdown.notified() => break,

                evt = self.io.broker.recv() => match evt {
                    Some(e) => self.handle_broker_event(e).await,
                    None => {
                        warn!("Broker channel closed");
                        break;
                    }
                },

                evt = self.link_rx.recv() => {
                    if let Some(e) = evt {
                        self.handle_link_event(e).await;
                    }
                }

                evt = self.timer_rx.recv() => {
                    if let Some(e) = evt {
                        self.handle_timer(e).await;
                    }
                }

                sample = self.io.samples.recv() => match sample {
                    Some(s) => self.handle_sample(s).await,
                    None => {
                        info!("Position source closed");
                        break;
                    }
                },

                _ = keepalive.tick() => self.handle_keepalive(),
            }
        }

        self.shutdown().await;
        info!("Client engine finished");
    }

    async fn shutdown(&mut self) {
        let actions = self.manager.teardown_all();
        self.apply(actions).await;
        if self.broker_connected {
            self.to_broker(ClientMessage::Disconnect);
        }
    }

    async fn handle_timer(&mut self, event: TimerEvent) {
        let now = tokio::time::Instant::now();
        let actions = match event {
            TimerEvent::AttemptDue { peer, token } => {
                clear_timer(&mut self.attempts, &peer, token);
                self.manager.on_attempt_due(&peer, token, now)
            }
            TimerEvent::WatchdogFired { peer, token } => {
                clear_timer(&mut self.watchdogs, &peer, token);
                self.manager.on_watchdog(&peer, token)
            }
        };
        self.apply(actions).await;
    }

    /// Best effort: a full or closed outbox drops the message.
    fn to_broker(&self, msg: ClientMessage) {
        let kind = msg.kind();
        if let Err(e) = self.io.outbound.try_send(msg) {
            warn!("Dropping {} for broker: {}", kind, e);
        }
    }

    fn emit(&self, event: ClientEvent) {
        let _ = self.io.events.send(event);
    }
}

/// Forgets a fired timer, unless it was already replaced by a newer one.
fn clear_timer(timers: &mut HashMap<ClientId, Timer>, peer: &ClientId, token: u64) {
    if timers.get(peer).is_some_and(|timer| timer.token == token) {
        timers.remove(peer);
    }
}
