use proxima_client::{BrokerStatus, ClientEvent, LinkEventKind, Role};
use proxima_core::{ClientMessage, ServerMessage};
use std::time::Duration;

use crate::integration::init_tracing;
use crate::utils::{EngineHarness, id, offers_to};

#[tokio::test(start_paused = true)]
async fn test_initiator_offers_and_connects() {
    init_tracing();

    let mut h = EngineHarness::start("bravo");
    h.status(BrokerStatus::Connected).await;
    h.nearby(&["alpha"]).await;

    let link = h.factory.link_to("alpha").expect("link opened");
    assert_eq!(link.role(), Role::Initiator);
    let out = h.outbound();
    assert_eq!(offers_to(&out), vec!["alpha"]);
    assert!(out.contains(&ClientMessage::SendOffer {
        target_id: id("alpha"),
        offer: "offer:bravo".into(),
    }));
    // the candidate generated while offering is relayed too
    assert!(out.contains(&ClientMessage::SendIceCandidate {
        target_id: id("alpha"),
        candidate: "cand:bravo".into(),
    }));

    h.deliver(ServerMessage::ReceiveAnswer {
        sender_id: id("alpha"),
        answer: "answer:alpha".into(),
    })
    .await;
    assert_eq!(link.record().remote_answer.as_deref(), Some("answer:alpha"));

    h.deliver(ServerMessage::ReceiveIceCandidate {
        sender_id: id("alpha"),
        candidate: "cand:alpha".into(),
    })
    .await;
    assert_eq!(link.record().candidates, vec!["cand:alpha".to_string()]);

    link.fire(LinkEventKind::Connected).await;
    h.settle().await;
    assert!(h.events().contains(&ClientEvent::PeerConnected(id("alpha"))));
}

#[tokio::test(start_paused = true)]
async fn test_responder_waits_then_answers() {
    init_tracing();

    let mut h = EngineHarness::start("alpha");
    h.status(BrokerStatus::Connected).await;
    h.nearby(&["bravo"]).await;

    assert!(h.factory.opened().is_empty(), "responder must not open a link before the offer");
    assert!(offers_to(&h.outbound()).is_empty());

    // a candidate racing ahead of the offer is kept until the link exists
    h.deliver(ServerMessage::ReceiveIceCandidate {
        sender_id: id("bravo"),
        candidate: "early".into(),
    })
    .await;
    h.deliver(ServerMessage::ReceiveOffer {
        sender_id: id("bravo"),
        offer: "offer:bravo".into(),
    })
    .await;

    let link = h.factory.link_to("bravo").expect("link opened");
    assert_eq!(link.role(), Role::Responder);
    let record = link.record();
    assert_eq!(record.remote_offer.as_deref(), Some("offer:bravo"));
    assert_eq!(record.candidates, vec!["early".to_string()]);
    assert!(h.outbound().contains(&ClientMessage::SendAnswer {
        target_id: id("bravo"),
        answer: "answer:alpha".into(),
    }));

    link.fire(LinkEventKind::Connected).await;
    h.settle().await;
    assert!(h.events().contains(&ClientEvent::PeerConnected(id("bravo"))));
}

#[tokio::test(start_paused = true)]
async fn test_offer_before_introduction_is_answered() {
    init_tracing();

    let mut h = EngineHarness::start("alpha");
    h.status(BrokerStatus::Connected).await;
    h.deliver(ServerMessage::ReceiveOffer {
        sender_id: id("bravo"),
        offer: "offer:bravo".into(),
    })
    .await;

    assert!(h.factory.link_to("bravo").is_some());
    let answered_bravo = |msg: &ClientMessage| {
        matches!(msg, ClientMessage::SendAnswer { target_id, .. } if *target_id == id("bravo"))
    };
    assert!(h.outbound().iter().any(answered_bravo));

    // the introduction that follows keeps the running handshake
    h.nearby(&["bravo"]).await;
    assert_eq!(h.factory.opened().len(), 1);
    assert!(h.outbound().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_failed_link_setup_is_abandoned() {
    init_tracing();

    let mut h = EngineHarness::start("bravo");
    h.factory.fail_opens(true);
    h.status(BrokerStatus::Connected).await;
    h.nearby(&["alpha"]).await;

    let out = h.outbound();
    assert!(offers_to(&out).is_empty());
    assert_eq!(out, vec![ClientMessage::RequestPeerRefresh]);
    assert!(h.events().contains(&ClientEvent::PeerGone(id("alpha"))));

    // a fresh introduction starts a new attempt once the stagger slot comes up
    h.factory.fail_opens(false);
    h.nearby(&["alpha"]).await;
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(offers_to(&h.outbound()), vec!["alpha"]);
}
