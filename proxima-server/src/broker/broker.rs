use crate::index::{Introduction, IntroductionEngine};
use crate::signaling::SignalingOutput;
use proxima_core::{ClientId, PositionUpdate};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::info;

/// Owns the introduction engine behind a single lock.
///
/// Every operation mutates the table and computes the resulting
/// introductions while holding the write lock, then drops the lock before
/// handing anything to the [`SignalingOutput`].
pub struct Broker {
    engine: RwLock<IntroductionEngine>,
    output: Arc<dyn SignalingOutput>,
}

impl Broker {
    pub fn new(range: u32, output: Arc<dyn SignalingOutput>) -> Self {
        Self {
            engine: RwLock::new(IntroductionEngine::new(range)),
            output,
        }
    }

    pub async fn update_position(&self, update: &PositionUpdate) {
        let intros = {
            let mut engine = self.engine.write().await;
            engine.update_position(update, Instant::now())
        };
        self.deliver(intros).await;
    }

    /// Like [`Broker::update_position`], but always sends the client its list.
    pub async fn rejoin(&self, update: &PositionUpdate) {
        let intros = {
            let mut engine = self.engine.write().await;
            engine.rejoin(update, Instant::now())
        };
        self.deliver(intros).await;
    }

    pub async fn request_refresh(&self, id: &ClientId) {
        let intros = {
            let mut engine = self.engine.write().await;
            engine.request_refresh(id)
        };
        self.deliver(intros).await;
    }

    pub async fn depart(&self, id: &ClientId) {
        let intros = {
            let mut engine = self.engine.write().await;
            engine.remove(id)
        };
        info!("Client {} left the proximity index", id);
        self.deliver(intros).await;
    }

    /// Removes clients silent for longer than `timeout`, returning their ids.
    pub async fn expire_stale(&self, timeout: Duration) -> Vec<ClientId> {
        let Some(cutoff) = Instant::now().checked_sub(timeout) else {
            return Vec::new();
        };
        let (expired, intros) = {
            let mut engine = self.engine.write().await;
            engine.expire(cutoff)
        };
        self.deliver(intros).await;
        expired
    }

    pub async fn neighbors_of(&self, id: &ClientId) -> Vec<ClientId> {
        let engine = self.engine.read().await;
        engine
            .index()
            .neighbors_of(id, engine.range())
            .into_iter()
            .collect()
    }

    pub async fn is_tracked(&self, id: &ClientId) -> bool {
        self.engine.read().await.index().contains(id)
    }

    pub async fn client_count(&self) -> usize {
        self.engine.read().await.index().len()
    }

    async fn deliver(&self, intros: Vec<Introduction>) {
        for intro in intros {
            self.output
                .send_nearby(intro.recipient, intro.peers, intro.revision)
                .await;
        }
    }
}
