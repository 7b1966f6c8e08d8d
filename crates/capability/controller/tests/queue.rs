use devlink_controller::WorkQueue;
use std::sync::Arc;
use std::time::Duration;

fn queue() -> Arc<WorkQueue<String>> {
    Arc::new(WorkQueue::new(
        Duration::from_millis(10),
        Duration::from_millis(40),
    ))
}

#[tokio::test]
async fn duplicate_keys_are_merged() {
    let queue = queue();
    queue.add("lamp".to_string());
    queue.add("lamp".to_string());
    queue.add("fan".to_string());
    assert_eq!(queue.len(), 2);

    assert_eq!(queue.get().await.as_deref(), Some("lamp"));
    assert_eq!(queue.get().await.as_deref(), Some("fan"));
    assert!(queue.is_empty());
}

#[tokio::test]
async fn key_in_process_is_requeued_on_done() {
    let queue = queue();
    queue.add("lamp".to_string());
    let key = queue.get().await.expect("key");

    queue.add("lamp".to_string());
    assert!(queue.is_empty());

    queue.done(&key);
    assert_eq!(queue.len(), 1);
    assert_eq!(queue.get().await.as_deref(), Some("lamp"));
    queue.done(&key);
    assert!(queue.is_empty());
}

#[tokio::test]
async fn rate_limited_backoff_grows_until_forgotten() {
    let queue = queue();
    let key = "lamp".to_string();
    for _ in 0..4 {
        queue.add_rate_limited(key.clone());
    }
    assert_eq!(queue.num_requeues(&key), 4);

    let delivered = tokio::time::timeout(Duration::from_secs(1), queue.get())
        .await
        .expect("delivered within the cap");
    assert_eq!(delivered, Some(key.clone()));

    queue.forget(&key);
    assert_eq!(queue.num_requeues(&key), 0);
}

#[tokio::test]
async fn add_after_delays_delivery() {
    let queue = queue();
    queue.add_after("lamp".to_string(), Duration::from_millis(30));
    assert!(queue.is_empty());

    let delivered = tokio::time::timeout(Duration::from_secs(1), queue.get())
        .await
        .expect("delivered");
    assert_eq!(delivered.as_deref(), Some("lamp"));
}

#[tokio::test]
async fn shutdown_releases_waiting_workers() {
    let queue = queue();
    let waiter = {
        let queue = queue.clone();
        tokio::spawn(async move { queue.get().await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    queue.shutdown();
    let received = waiter.await.expect("join");
    assert!(received.is_none());
    assert!(queue.is_shutting_down());

    queue.add("lamp".to_string());
    assert!(queue.is_empty());
}
