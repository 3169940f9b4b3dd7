use proxima_core::MapPosition;

/// Maps the distance to a peer onto an output gain in `0.0..=1.0`.
///
/// Full volume up to `full_volume_radius`, then a linear fade reaching
/// silence at `range`.
#[derive(Debug, Clone, Copy)]
pub struct DistanceAttenuator {
    range: f32,
    full_volume_radius: f32,
}

impl DistanceAttenuator {
    pub fn new(range: u32, full_volume_radius: u32) -> Self {
        let range = range as f32;
        Self {
            range,
            full_volume_radius: (full_volume_radius as f32).min(range),
        }
    }

    pub fn gain(&self, local: &MapPosition, remote: &MapPosition) -> f32 {
        if local.map_id != remote.map_id {
            return 0.0;
        }
        self.gain_at(local.distance(remote))
    }

    pub fn gain_at(&self, distance: f32) -> f32 {
        if distance <= self.full_volume_radius {
            return 1.0;
        }
        if distance >= self.range {
            return 0.0;
        }
        let fade = self.range - self.full_volume_radius;
        (1.0 - (distance - self.full_volume_radius) / fade).clamp(0.0, 1.0)
    }
}
