use proxima_server::Broker;
use std::sync::Arc;

use crate::integration::init_tracing;
use crate::utils::{MockSignalingOutput, id, ids, position};

#[tokio::test]
async fn test_departure_reaches_both_sides() {
    init_tracing();

    let (signaling, _rx) = MockSignalingOutput::new();
    let broker = Broker::new(20, Arc::new(signaling.clone()));

    broker.update_position(&position("a", 1, 0, 0)).await;
    broker.update_position(&position("b", 1, 15, 0)).await;
    assert_eq!(signaling.last_for(&id("a")).await, Some(ids(&["b"])));
    assert_eq!(signaling.last_for(&id("b")).await, Some(ids(&["a"])));

    broker.update_position(&position("b", 1, 50, 0)).await;
    assert_eq!(signaling.last_for(&id("a")).await, Some(vec![]));
    assert_eq!(signaling.last_for(&id("b")).await, Some(vec![]));

    let settled = signaling.count().await;
    broker.update_position(&position("a", 1, 0, 0)).await;
    broker.update_position(&position("b", 1, 50, 0)).await;
    assert_eq!(signaling.count().await, settled);
}

#[tokio::test]
async fn test_disconnect_notifies_remaining_peers_immediately() {
    init_tracing();

    let (signaling, _rx) = MockSignalingOutput::new();
    let broker = Broker::new(20, Arc::new(signaling.clone()));

    broker.update_position(&position("a", 1, 0, 0)).await;
    broker.update_position(&position("b", 1, 5, 0)).await;
    broker.update_position(&position("c", 1, 10, 0)).await;

    broker.depart(&id("a")).await;

    assert_eq!(signaling.last_for(&id("b")).await, Some(ids(&["c"])));
    assert_eq!(signaling.last_for(&id("c")).await, Some(ids(&["b"])));
    assert!(!broker.is_tracked(&id("a")).await);

    let settled = signaling.count().await;
    broker.depart(&id("a")).await;
    assert_eq!(signaling.count().await, settled);
}
