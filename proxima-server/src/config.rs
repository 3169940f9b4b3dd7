use proxima_core::utils::DEFAULT_RANGE;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Address the WebSocket listener binds to.
    pub bind: SocketAddr,
    /// Maximum distance for two clients to be introduced.
    pub range: u32,
    /// Clients silent for longer than this are dropped.
    pub stale_timeout: Duration,
    pub sweep_interval: Duration,
    /// Per-connection outbound queue length; overflow is dropped, not awaited.
    pub outbox_capacity: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            range: DEFAULT_RANGE,
            stale_timeout: Duration::from_secs(15),
            sweep_interval: Duration::from_secs(5),
            outbox_capacity: 100,
        }
    }
}
