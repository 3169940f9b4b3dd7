use proxima_core::{ClientMessage, ServerMessage};
use proxima_server::BrokerConfig;
use std::time::Duration;

use crate::integration::init_tracing;
use crate::utils::{WsTestClient, id, ids, spawn_broker, update};

#[tokio::test]
async fn test_two_clients_meet_and_part_over_websocket() {
    init_tracing();

    let addr = spawn_broker(BrokerConfig::default()).await;
    let mut a = WsTestClient::connect(addr).await;
    let mut b = WsTestClient::connect(addr).await;

    a.send(&update("A", 1, 0, 0)).await;
    // let A's registration land before B shows up
    tokio::time::sleep(Duration::from_millis(50)).await;
    b.send(&update("B", 1, 15, 0)).await;

    assert_eq!(b.recv().await, ServerMessage::NearbyPeers(ids(&["A"])));
    assert_eq!(a.recv().await, ServerMessage::NearbyPeers(ids(&["B"])));

    b.send(&ClientMessage::SendOffer {
        target_id: id("A"),
        offer: "sdp-offer".into(),
    })
    .await;
    assert_eq!(
        a.recv().await,
        ServerMessage::ReceiveOffer {
            sender_id: id("B"),
            offer: "sdp-offer".into(),
        }
    );

    b.send(&ClientMessage::Disconnect).await;
    assert_eq!(a.recv().await, ServerMessage::NearbyPeers(vec![]));
    b.close().await;
    a.close().await;
}

#[tokio::test]
async fn test_garbage_frame_keeps_socket_open() {
    init_tracing();

    let addr = spawn_broker(BrokerConfig::default()).await;
    let mut a = WsTestClient::connect(addr).await;

    a.send_raw("{{{").await;
    assert!(matches!(a.recv().await, ServerMessage::Error(_)));

    a.send(&ClientMessage::RequestPeerRefresh).await;
    assert_eq!(
        a.recv().await,
        ServerMessage::Error("Client must send UpdatePosition first.".to_string())
    );
    a.close().await;
}
