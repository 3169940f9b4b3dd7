use proxima_core::MapPosition;
use std::time::Duration;
use tokio::time::Instant;

/// One reading of the local character, as delivered by the position source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalSample {
    pub map_id: i32,
    pub x: i32,
    pub y: i32,
    pub character_name: String,
}

impl LocalSample {
    pub fn position(&self) -> MapPosition {
        MapPosition::new(self.map_id, self.x, self.y)
    }
}

/// Decides which local samples are worth reporting to the broker.
///
/// A sample is sent when it differs from the last sent one, and the last
/// known position is re-sent once `force_interval` passes without a send.
#[derive(Debug)]
pub struct PositionReporter {
    force_interval: Duration,
    latest: Option<MapPosition>,
    last_sent: Option<(MapPosition, Instant)>,
}

impl PositionReporter {
    pub fn new(force_interval: Duration) -> Self {
        Self {
            force_interval,
            latest: None,
            last_sent: None,
        }
    }

    /// Records a sample; returns the position to send, if any.
    pub fn observe(&mut self, position: MapPosition, now: Instant) -> Option<MapPosition> {
        self.latest = Some(position);
        let due = match self.last_sent {
            None => true,
            Some((sent, at)) => sent != position || now.duration_since(at) >= self.force_interval,
        };
        due.then(|| self.mark_sent(position, now))
    }

    /// Periodic check without a new sample.
    pub fn keepalive(&mut self, now: Instant) -> Option<MapPosition> {
        let position = self.latest?;
        let due = match self.last_sent {
            None => true,
            Some((_, at)) => now.duration_since(at) >= self.force_interval,
        };
        due.then(|| self.mark_sent(position, now))
    }

    pub fn latest(&self) -> Option<MapPosition> {
        self.latest
    }

    /// Forgets what was sent, so the next check reports immediately.
    pub fn reset(&mut self) {
        self.last_sent = None;
    }

    fn mark_sent(&mut self, position: MapPosition, now: Instant) -> MapPosition {
        self.last_sent = Some((position, now));
        position
    }
}
