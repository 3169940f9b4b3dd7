use proxima_client::{BrokerStatus, ClientEvent, LinkEventKind};
use proxima_core::{MapPosition, PeerPacket, PeerPosition, ServerMessage};

use crate::integration::init_tracing;
use crate::utils::{EngineHarness, id, sample};

fn position_packet(map_id: i32, x: i32, y: i32, name: &str) -> LinkEventKind {
    let packet = PeerPacket::Position(PeerPosition::new(MapPosition::new(map_id, x, y), name));
    LinkEventKind::Message(packet.encode().unwrap())
}

fn gains(events: &[ClientEvent]) -> Vec<(String, f32)> {
    events
        .iter()
        .filter_map(|event| match event {
            ClientEvent::PeerGain { peer, gain, .. } => Some((peer.to_string(), *gain)),
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_position_sent_when_channel_opens_and_on_move() {
    init_tracing();

    let mut h = EngineHarness::start("alpha");
    h.status(BrokerStatus::Connected).await;
    h.feed(sample(1, 0, 0)).await;
    h.deliver(ServerMessage::ReceiveOffer {
        sender_id: id("bravo"),
        offer: "offer:bravo".into(),
    })
    .await;
    let link = h.factory.link_to("bravo").expect("link opened");
    assert!(link.record().sent.is_empty());

    link.fire(LinkEventKind::Connected).await;
    h.settle().await;
    let sent = link.record().sent;
    assert_eq!(sent.len(), 1);
    let PeerPacket::Position(first) = PeerPacket::decode(&sent[0]).unwrap();
    assert_eq!(first.position(), MapPosition::new(1, 0, 0));
    assert_eq!(first.character_name.as_str(), "Tester");

    h.feed(sample(1, 0, 0)).await;
    assert_eq!(link.record().sent.len(), 1);

    h.feed(sample(1, 3, 0)).await;
    assert_eq!(link.record().sent.len(), 2);
    h.events();
}

#[tokio::test(start_paused = true)]
async fn test_peer_positions_become_gains() {
    init_tracing();

    let mut h = EngineHarness::start("alpha");
    h.status(BrokerStatus::Connected).await;
    h.feed(sample(1, 0, 0)).await;
    h.deliver(ServerMessage::ReceiveOffer {
        sender_id: id("bravo"),
        offer: "offer:bravo".into(),
    })
    .await;
    let link = h.factory.link_to("bravo").expect("link opened");
    link.fire(LinkEventKind::Connected).await;
    h.settle().await;
    h.events();

    link.fire(position_packet(1, 2, 0, "Bravo")).await;
    h.settle().await;
    let events = h.events();
    assert_eq!(gains(&events), vec![("bravo".to_string(), 1.0)]);
    assert!(events.iter().any(|e| matches!(
        e,
        ClientEvent::PeerGain { character_name, .. } if character_name == "Bravo"
    )));

    link.fire(position_packet(2, 2, 0, "Bravo")).await;
    h.settle().await;
    assert_eq!(gains(&h.events()), vec![("bravo".to_string(), 0.0)]);

    // our own move re-evaluates the gain: distance 12 is halfway through the fade
    link.fire(position_packet(1, 12, 0, "Bravo")).await;
    h.settle().await;
    h.events();
    h.feed(sample(1, 0, 0)).await;
    h.feed(sample(1, 0, 1)).await;
    let after_move = gains(&h.events());
    assert_eq!(after_move.len(), 1);
    assert!(after_move[0].1 > 0.4 && after_move[0].1 < 0.55);
}

#[tokio::test(start_paused = true)]
async fn test_positions_from_unconnected_peers_are_dropped() {
    init_tracing();

    let mut h = EngineHarness::start("alpha");
    h.status(BrokerStatus::Connected).await;
    h.feed(sample(1, 0, 0)).await;
    h.deliver(ServerMessage::ReceiveOffer {
        sender_id: id("bravo"),
        offer: "offer:bravo".into(),
    })
    .await;
    let link = h.factory.link_to("bravo").expect("link opened");
    h.events();

    // still negotiating
    link.fire(position_packet(1, 1, 1, "Bravo")).await;
    link.fire(LinkEventKind::Message(bytes::Bytes::from_static(b"\xff\xff"))).await;
    h.settle().await;
    assert!(gains(&h.events()).is_empty());
}
