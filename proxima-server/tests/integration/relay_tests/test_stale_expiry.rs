use proxima_core::ServerMessage;
use std::time::Duration;

use crate::integration::{create_test_relay, init_tracing};
use crate::utils::{TestClient, id, update};

#[tokio::test(start_paused = true)]
async fn test_silent_client_is_expired_and_peers_told() {
    init_tracing();

    let relay = create_test_relay();
    let mut quiet = TestClient::new(&relay);
    let mut chatty = TestClient::new(&relay);
    quiet.send(update("Q", 1, 0, 0)).await;
    chatty.send(update("C", 1, 4, 0)).await;
    quiet.drain();
    chatty.drain();

    for _ in 0..4 {
        tokio::time::advance(Duration::from_secs(5)).await;
        chatty.send(update("C", 1, 4, 0)).await;
    }

    let closer = quiet.session.as_ref().map(|s| s.closer()).expect("session");
    let expired = relay.sweep().await;

    assert_eq!(expired, vec![id("Q")]);
    assert_eq!(chatty.drain(), vec![ServerMessage::NearbyPeers(vec![])]);
    assert!(!relay.registry().contains(&id("Q")));

    // the evicted socket loop is told to stop
    tokio::time::timeout(Duration::from_millis(10), closer.notified())
        .await
        .expect("closer was not notified");

    // its eventual close is a no-op
    quiet.close().await;
    chatty.assert_silent();
}

#[tokio::test(start_paused = true)]
async fn test_keepalive_prevents_expiry() {
    init_tracing();

    let relay = create_test_relay();
    let mut a = TestClient::new(&relay);
    a.send(update("A", 1, 0, 0)).await;

    for _ in 0..10 {
        tokio::time::advance(Duration::from_secs(5)).await;
        a.send(update("A", 1, 0, 0)).await;
        assert!(relay.sweep().await.is_empty());
    }
}

#[tokio::test(start_paused = true)]
async fn test_position_racing_the_sweep_does_not_leave_a_ghost() {
    init_tracing();

    let relay = create_test_relay();
    let mut quiet = TestClient::new(&relay);
    let mut chatty = TestClient::new(&relay);
    quiet.send(update("Q", 1, 0, 0)).await;
    chatty.send(update("C", 1, 4, 0)).await;
    quiet.drain();
    chatty.drain();

    tokio::time::advance(Duration::from_secs(16)).await;
    chatty.send(update("C", 1, 4, 0)).await;

    // expiry and eviction are separate steps; a late position lands between them
    let expired = relay.broker().expire_stale(Duration::from_secs(15)).await;
    assert_eq!(expired, vec![id("Q")]);
    quiet.send(update("Q", 1, 0, 0)).await;
    relay.registry().evict(&id("Q"));
    assert!(relay.broker().is_tracked(&id("Q")).await);

    // once evicted the session is ignored and its close removes the record
    quiet.send(update("Q", 1, 1, 0)).await;
    quiet.close().await;
    assert!(!relay.broker().is_tracked(&id("Q")).await);
    assert_eq!(chatty.last_nearby(), Some(vec![]));
}

#[tokio::test(start_paused = true)]
async fn test_evicted_session_positions_are_ignored() {
    init_tracing();

    let relay = create_test_relay();
    let mut quiet = TestClient::new(&relay);
    let mut chatty = TestClient::new(&relay);
    quiet.send(update("Q", 1, 0, 0)).await;
    chatty.send(update("C", 1, 4, 0)).await;
    chatty.drain();

    tokio::time::advance(Duration::from_secs(16)).await;
    chatty.send(update("C", 1, 4, 0)).await;
    assert_eq!(relay.sweep().await, vec![id("Q")]);
    chatty.drain();

    quiet.send(update("Q", 1, 0, 0)).await;
    assert!(!relay.broker().is_tracked(&id("Q")).await);
    chatty.assert_silent();
}
