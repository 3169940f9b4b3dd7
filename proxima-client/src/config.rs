use proxima_core::ClientId;
use proxima_core::utils::{DEFAULT_CHANNEL, DEFAULT_RANGE, default_stun_servers};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WebSocket endpoint of the broker, e.g. `ws://127.0.0.1:8080/ws`.
    pub broker_url: String,
    pub client_id: ClientId,
    pub channel: i32,
    /// Distance at which a peer fades to silence.
    pub range: u32,
    /// Distance up to which a peer plays at full volume.
    pub full_volume_radius: u32,
    /// Longest gap between two position reports.
    pub force_interval: Duration,
    /// Bound for a handshake to reach the connected state.
    pub handshake_timeout: Duration,
    /// Spacing between consecutive outgoing connection attempts.
    pub attempt_stagger: Duration,
    pub reconnect_delay: Duration,
    pub ice_servers: Vec<String>,
}

impl ClientConfig {
    pub fn new(broker_url: impl Into<String>) -> Self {
        Self {
            broker_url: broker_url.into(),
            ..Self::default()
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            broker_url: "ws://127.0.0.1:8080/ws".to_string(),
            client_id: ClientId::random(),
            channel: DEFAULT_CHANNEL,
            range: DEFAULT_RANGE,
            full_volume_radius: 4,
            force_interval: Duration::from_secs(5),
            handshake_timeout: Duration::from_secs(15),
            attempt_stagger: Duration::from_millis(250),
            reconnect_delay: Duration::from_secs(2),
            ice_servers: default_stun_servers(),
        }
    }
}
