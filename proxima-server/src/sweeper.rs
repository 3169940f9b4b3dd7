use crate::signaling::SignalingRelay;
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};
use tracing::info;

/// Periodically expires clients that stopped sending positions.
pub async fn run_sweeper(relay: SignalingRelay) {
    // a zero period would panic
    let period = relay.config().sweep_interval.max(Duration::from_millis(1));
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        let expired = relay.sweep().await;
        if !expired.is_empty() {
            info!("Expired {} silent client(s)", expired.len());
        }
    }
}
