use proxima_core::ClientId;
use async_trait::async_trait;

/// Where the broker hands nearby-lists for delivery.
///
/// Implementations must not wait on a slow recipient: delivery is
/// fire-and-forget. Lists are computed under the broker lock but delivered
/// after it is released, so two lists for one client may arrive out of
/// order; a list whose `revision` is not newer than one already delivered
/// to that client must be dropped.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    /// Send `client_id` the full list of peers currently near it.
    async fn send_nearby(&self, client_id: ClientId, peers: Vec<ClientId>, revision: u64);
}
