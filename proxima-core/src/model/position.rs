use serde::{Deserialize, Serialize};

/// A point on a named (numbered) map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MapPosition {
    pub map_id: i32,
    pub x: i32,
    pub y: i32,
}

impl MapPosition {
    pub fn new(map_id: i32, x: i32, y: i32) -> Self {
        Self { map_id, x, y }
    }

    /// Squared euclidean distance, ignoring the map.
    pub fn distance_squared(&self, other: &MapPosition) -> u64 {
        let dx = u64::from(self.x.abs_diff(other.x));
        let dy = u64::from(self.y.abs_diff(other.y));
        (dx * dx).saturating_add(dy * dy)
    }

    pub fn distance(&self, other: &MapPosition) -> f32 {
        (self.distance_squared(other) as f64).sqrt() as f32
    }

    /// Same map and no further than `range` apart (boundary included).
    pub fn within(&self, other: &MapPosition, range: u32) -> bool {
        let range = u64::from(range);
        self.map_id == other.map_id && self.distance_squared(other) <= range * range
    }
}
