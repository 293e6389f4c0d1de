//! Closing the store stops the dispatch loop.

use super::harness::{fast_config, wait_until, RecordingSink, SinkBehavior};
use crate::dispatcher::Dispatcher;
use crate::pool::{DeliveryWorker, WorkerPool};
use crate::registry::DeliveryQueue;
use crate::stats::DeliveryStats;
use crate::store::{MemoryStore, QueueStore, StoreError};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

#[tokio::test]
async fn dispatch_loop_exits_when_store_closes() {
    let config = fast_config(1);
    let store = Arc::new(MemoryStore::new());
    let stats = Arc::new(DeliveryStats::default());
    let worker = DeliveryWorker::new(
        Arc::new(RecordingSink::new()),
        store.clone(),
        config.retry.clone(),
        stats.clone(),
    );
    let pool = Arc::new(WorkerPool::new(1, worker));
    let dispatcher = Arc::new(Dispatcher::new(
        store.clone(),
        pool,
        config.retry,
        config.timings,
        stats,
    ));

    let running = {
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move { dispatcher.run().await })
    };

    // Parked in blocking_pop on an empty store.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!running.is_finished());

    store.close().await.unwrap();
    timeout(Duration::from_secs(1), running)
        .await
        .expect("dispatch loop should stop after close")
        .unwrap();
}

#[tokio::test]
async fn shutdown_waits_for_in_flight_attempts() {
    let sink = Arc::new(RecordingSink::new());
    sink.set_default(SinkBehavior::Delay(Duration::from_millis(150)));
    let queue = DeliveryQueue::new(
        "draining",
        Arc::new(MemoryStore::new()),
        sink.clone(),
        &fast_config(2),
    );
    queue.start();

    queue.push_text(1, None, "slow").await.unwrap();
    assert!(wait_until(Duration::from_secs(1), || sink.call_count() == 1).await);

    timeout(Duration::from_secs(2), queue.shutdown())
        .await
        .expect("shutdown should finish")
        .unwrap();

    assert_eq!(queue.stats().delivered, 1);
    assert!(!queue.is_running());
}

#[tokio::test]
async fn close_is_observed_by_late_pops() {
    let store = MemoryStore::new();
    store.close().await.unwrap();

    let result = timeout(Duration::from_millis(100), store.blocking_pop())
        .await
        .expect("pop on a closed store must not block");
    assert!(matches!(result, Err(StoreError::Closed)));
}
