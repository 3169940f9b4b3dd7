use proxima_core::ClientMessage::{self, UpdatePosition};
use proxima_core::ServerMessage;

use crate::integration::{create_test_relay, init_tracing};
use crate::utils::{TestClient, ids, position_on, update};

#[tokio::test]
async fn test_reference_scenario() {
    init_tracing();

    let relay = create_test_relay();
    let mut a = TestClient::new(&relay);
    let mut b = TestClient::new(&relay);

    a.send(update("A", 1, 0, 0)).await;
    a.assert_silent();

    b.send(update("B", 1, 15, 0)).await;
    assert_eq!(a.drain(), vec![ServerMessage::NearbyPeers(ids(&["B"]))]);
    assert_eq!(b.drain(), vec![ServerMessage::NearbyPeers(ids(&["A"]))]);

    b.send(update("B", 1, 50, 0)).await;
    assert_eq!(a.drain(), vec![ServerMessage::NearbyPeers(vec![])]);
    assert_eq!(b.drain(), vec![ServerMessage::NearbyPeers(vec![])]);

    for _ in 0..5 {
        a.send(update("A", 1, 0, 0)).await;
        b.send(update("B", 1, 50, 0)).await;
    }
    a.assert_silent();
    b.assert_silent();
}

#[tokio::test]
async fn test_refresh_resends_current_list() {
    init_tracing();

    let relay = create_test_relay();
    let mut a = TestClient::new(&relay);
    let mut b = TestClient::new(&relay);

    a.send(update("A", 1, 0, 0)).await;
    b.send(update("B", 1, 3, 4)).await;
    a.drain();
    b.drain();

    a.send(ClientMessage::RequestPeerRefresh).await;
    assert_eq!(a.drain(), vec![ServerMessage::NearbyPeers(ids(&["B"]))]);
    b.assert_silent();
}

#[tokio::test]
async fn test_channels_partition_a_crowd() {
    init_tracing();

    let relay = create_test_relay();
    let mut a = TestClient::new(&relay);
    let mut b = TestClient::new(&relay);
    let mut c = TestClient::new(&relay);

    a.send(UpdatePosition(position_on("A", 1, 0, 0, 0))).await;
    b.send(UpdatePosition(position_on("B", 1, 7, 0, 0))).await;
    c.send(UpdatePosition(position_on("C", 1, 0, 1, 1))).await;

    assert_eq!(a.drain(), vec![ServerMessage::NearbyPeers(ids(&["C"]))]);
    b.assert_silent();
    assert_eq!(c.drain(), vec![ServerMessage::NearbyPeers(ids(&["A"]))]);
}
