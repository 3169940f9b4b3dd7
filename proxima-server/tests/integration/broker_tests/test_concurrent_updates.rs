use proxima_server::Broker;
use std::sync::Arc;

use crate::integration::init_tracing;
use crate::utils::{MockSignalingOutput, id, position};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_updates_keep_lists_symmetric() {
    init_tracing();

    let (signaling, _rx) = MockSignalingOutput::new();
    let broker = Arc::new(Broker::new(20, Arc::new(signaling.clone())));

    let mut tasks = Vec::new();
    for i in 0..32 {
        let broker = broker.clone();
        tasks.push(tokio::spawn(async move {
            let name = format!("c{i:02}");
            for step in 0..10 {
                let x = (i * 7 + step * 3) % 60;
                broker.update_position(&position(&name, 1, x, i % 4)).await;
            }
        }));
    }
    for task in tasks {
        task.await.expect("update task panicked");
    }

    assert_eq!(broker.client_count().await, 32);

    for i in 0..32 {
        let a = id(&format!("c{i:02}"));
        let near_a = broker.neighbors_of(&a).await;
        assert!(!near_a.contains(&a));
        for b in &near_a {
            assert!(broker.neighbors_of(b).await.contains(&a), "{a} -> {b} not mirrored");
        }

        // whatever was last delivered matches the settled state
        let delivered = signaling.last_for(&a).await.unwrap_or_default();
        assert_eq!(delivered, near_a, "stale list delivered to {a}");
    }
}
