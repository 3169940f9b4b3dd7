use proxima_core::{ClientId, MapPosition};
use std::collections::{BTreeSet, HashMap};
use tokio::time::Instant;

/// Everything the broker knows about one connected client.
#[derive(Debug, Clone)]
pub struct ClientRecord {
    pub id: ClientId,
    pub position: MapPosition,
    pub channel: i32,
    pub last_update: Instant,
}

impl ClientRecord {
    /// Same map, same channel, within `range` (inclusive).
    pub fn can_hear(&self, other: &ClientRecord, range: u32) -> bool {
        self.channel == other.channel && self.position.within(&other.position, range)
    }
}

/// Flat table of client positions.
///
/// Neighbor queries are a linear scan; with a few hundred clients that is
/// cheaper than maintaining a spatial structure under constant movement.
#[derive(Debug, Default)]
pub struct ProximityIndex {
    clients: HashMap<ClientId, ClientRecord>,
}

impl ProximityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(
        &mut self,
        id: ClientId,
        position: MapPosition,
        channel: i32,
        now: Instant,
    ) -> &ClientRecord {
        let record = self
            .clients
            .entry(id.clone())
            .or_insert_with(|| ClientRecord {
                id,
                position,
                channel,
                last_update: now,
            });
        record.position = position;
        record.channel = channel;
        record.last_update = now;
        record
    }

    pub fn get(&self, id: &ClientId) -> Option<&ClientRecord> {
        self.clients.get(id)
    }

    pub fn contains(&self, id: &ClientId) -> bool {
        self.clients.contains_key(id)
    }

    /// Ids on the same map and channel within `range` of `id`, never `id` itself.
    /// Unknown ids have no neighbors.
    pub fn neighbors_of(&self, id: &ClientId, range: u32) -> BTreeSet<ClientId> {
        let Some(subject) = self.clients.get(id) else {
            return BTreeSet::new();
        };

        self.clients
            .values()
            .filter(|other| other.id != *id && subject.can_hear(other, range))
            .map(|other| other.id.clone())
            .collect()
    }

    pub fn remove(&mut self, id: &ClientId) -> Option<ClientRecord> {
        self.clients.remove(id)
    }

    /// Ids whose last update is strictly older than `cutoff`.
    pub fn stale_since(&self, cutoff: Instant) -> Vec<ClientId> {
        self.clients
            .values()
            .filter(|record| record.last_update < cutoff)
            .map(|record| record.id.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
