use crate::index::proximity_index::ProximityIndex;
use proxima_core::{ClientId, PositionUpdate};
use std::collections::{BTreeSet, HashMap};
use tokio::time::Instant;
use tracing::{debug, warn};

/// Change of a client's proximity set between two notifications.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntroductionDelta {
    pub new_peers: BTreeSet<ClientId>,
    pub lost_peers: BTreeSet<ClientId>,
}

impl IntroductionDelta {
    pub fn between(previous: &BTreeSet<ClientId>, current: &BTreeSet<ClientId>) -> Self {
        Self {
            new_peers: current.difference(previous).cloned().collect(),
            lost_peers: previous.difference(current).cloned().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.new_peers.is_empty() && self.lost_peers.is_empty()
    }

    /// Every peer whose relationship with the subject changed.
    pub fn affected(&self) -> impl Iterator<Item = &ClientId> {
        self.new_peers.iter().chain(self.lost_peers.iter())
    }
}

/// A full nearby-list addressed to one client.
///
/// `revision` grows with every list the engine produces, so a deliverer
/// racing another can tell which list is newer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Introduction {
    pub recipient: ClientId,
    pub peers: Vec<ClientId>,
    pub revision: u64,
}

/// Turns position updates into the minimal set of nearby-list notifications.
///
/// The engine remembers the last list each client was sent. A list is only
/// sent again when membership changed, so movement inside a stable group
/// produces nothing. The engine does no I/O: callers deliver the returned
/// [`Introduction`]s after releasing whatever lock guards the engine.
#[derive(Debug)]
pub struct IntroductionEngine {
    index: ProximityIndex,
    range: u32,
    notified: HashMap<ClientId, BTreeSet<ClientId>>,
    revision: u64,
}

impl IntroductionEngine {
    pub fn new(range: u32) -> Self {
        Self {
            index: ProximityIndex::new(),
            range,
            notified: HashMap::new(),
            revision: 0,
        }
    }

    pub fn range(&self) -> u32 {
        self.range
    }

    pub fn index(&self) -> &ProximityIndex {
        &self.index
    }

    pub fn update_position(&mut self, update: &PositionUpdate, now: Instant) -> Vec<Introduction> {
        self.index.upsert(
            update.client_id.clone(),
            update.position(),
            update.channel,
            now,
        );
        self.reconcile(&update.client_id, false)
    }

    /// Records a position from a client that took over an existing id on a
    /// new connection. The list is always sent since the old connection may
    /// have received the last one.
    pub fn rejoin(&mut self, update: &PositionUpdate, now: Instant) -> Vec<Introduction> {
        self.index.upsert(
            update.client_id.clone(),
            update.position(),
            update.channel,
            now,
        );
        self.reconcile(&update.client_id, true)
    }

    /// Resends `id` its current list even if nothing changed.
    pub fn request_refresh(&mut self, id: &ClientId) -> Vec<Introduction> {
        if !self.index.contains(id) {
            debug!("Refresh requested by unknown client {}", id);
            return Vec::new();
        }
        self.reconcile(id, true)
    }

    /// Drops `id` and re-notifies everyone who was last told about it.
    pub fn remove(&mut self, id: &ClientId) -> Vec<Introduction> {
        self.index.remove(id);
        self.notified.remove(id);

        let mut watchers: Vec<ClientId> = self
            .notified
            .iter()
            .filter(|(_, peers)| peers.contains(id))
            .map(|(watcher, _)| watcher.clone())
            .collect();
        watchers.sort();

        watchers
            .into_iter()
            .map(|watcher| self.notify(&watcher))
            .collect()
    }

    /// Removes every client silent since before `cutoff`.
    pub fn expire(&mut self, cutoff: Instant) -> (Vec<ClientId>, Vec<Introduction>) {
        let stale = self.index.stale_since(cutoff);
        let mut intros = Vec::new();
        for id in &stale {
            intros.extend(self.remove(id));
        }
        // a client expired later in the loop may already have been re-notified
        intros.retain(|intro| !stale.contains(&intro.recipient));
        (stale, intros)
    }

    /// Peer set last delivered to `id`.
    pub fn last_notified(&self, id: &ClientId) -> Option<&BTreeSet<ClientId>> {
        self.notified.get(id)
    }

    fn reconcile(&mut self, subject: &ClientId, force: bool) -> Vec<Introduction> {
        let current = self.current_set(subject);
        let delta = match self.notified.get(subject) {
            Some(previous) => IntroductionDelta::between(previous, &current),
            None => IntroductionDelta::between(&BTreeSet::new(), &current),
        };

        if delta.is_empty() && !force {
            return Vec::new();
        }

        debug!(
            "Proximity change for {}: +{} -{}",
            subject,
            delta.new_peers.len(),
            delta.lost_peers.len()
        );

        let mut out = vec![self.store(subject, current)];
        for peer in delta.affected() {
            if self.index.contains(peer) {
                out.push(self.notify(peer));
            }
        }
        out
    }

    fn notify(&mut self, id: &ClientId) -> Introduction {
        let current = self.current_set(id);
        self.store(id, current)
    }

    fn store(&mut self, id: &ClientId, current: BTreeSet<ClientId>) -> Introduction {
        let peers = current.iter().cloned().collect();
        self.notified.insert(id.clone(), current);
        self.revision += 1;
        Introduction {
            recipient: id.clone(),
            peers,
            revision: self.revision,
        }
    }

    fn current_set(&self, id: &ClientId) -> BTreeSet<ClientId> {
        let mut set = self.index.neighbors_of(id, self.range);
        if set.remove(id) {
            warn!("Dropped self-reference from nearby list of {}", id);
        }
        set
    }
}
