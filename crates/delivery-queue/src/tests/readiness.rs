//! Not-yet-eligible envelopes go back to the tail unchanged.

use super::harness::{fast_config, wait_until, RecordingSink};
use crate::dispatcher::{Dispatcher, Step};
use crate::envelope::Envelope;
use crate::pool::{DeliveryWorker, WorkerPool};
use crate::registry::DeliveryQueue;
use crate::stats::DeliveryStats;
use crate::store::{MemoryStore, QueueStore};
use chrono::{TimeDelta, Utc};
use std::sync::Arc;
use std::time::Duration;

fn dispatcher(store: Arc<MemoryStore>, sink: Arc<RecordingSink>) -> (Dispatcher, Arc<WorkerPool>) {
    let config = fast_config(2);
    let stats = Arc::new(DeliveryStats::default());
    let worker = DeliveryWorker::new(sink, store.clone(), config.retry.clone(), stats.clone());
    let pool = Arc::new(WorkerPool::new(config.pool_size, worker));
    let dispatcher = Dispatcher::new(store, pool.clone(), config.retry, config.timings, stats);
    (dispatcher, pool)
}

fn pending_envelope(chat_id: i64) -> Envelope {
    let mut envelope = Envelope::text(chat_id, None, "later", Duration::from_secs(10));
    envelope.next_eligible_at = Utc::now() + TimeDelta::minutes(5);
    envelope
}

#[tokio::test]
async fn pending_envelope_is_requeued_byte_identical() {
    let store = Arc::new(MemoryStore::new());
    let sink = Arc::new(RecordingSink::new());
    let (dispatcher, _pool) = dispatcher(store.clone(), sink.clone());

    // Spacing that re-encoding would not reproduce.
    let original = format!(
        "{{ \"chatId\": 5, \"type\": \"text\", \"message\": \"later\", \"nextTime\": \"{}\" }}",
        (Utc::now() + TimeDelta::minutes(5)).to_rfc3339()
    )
    .into_bytes();
    store.push(original.clone()).await.unwrap();

    let size_before = store.size().await.unwrap();
    assert_eq!(dispatcher.step().await, Step::Deferred);
    assert_eq!(store.size().await.unwrap(), size_before);

    let requeued = store.blocking_pop().await.unwrap();
    assert_eq!(requeued, original);
    assert_eq!(Envelope::decode(&requeued).unwrap().raw(), Some(original.as_slice()));
    assert_eq!(sink.call_count(), 0);
}

#[tokio::test]
async fn pending_envelope_moves_behind_ready_ones() {
    let store = Arc::new(MemoryStore::new());
    let sink = Arc::new(RecordingSink::new());
    let (dispatcher, pool) = dispatcher(store.clone(), sink.clone());

    store.push(pending_envelope(1).encode().unwrap()).await.unwrap();
    for chat_id in [2, 3] {
        let ready = Envelope::text(chat_id, None, "now", Duration::from_secs(10));
        store.push(ready.encode().unwrap()).await.unwrap();
    }

    assert_eq!(dispatcher.step().await, Step::Deferred);
    assert_eq!(dispatcher.step().await, Step::Dispatched);
    assert_eq!(dispatcher.step().await, Step::Dispatched);
    assert_eq!(dispatcher.step().await, Step::Deferred);

    pool.drain().await;
    let mut delivered: Vec<i64> = sink.calls().iter().map(|c| c.chat_id).collect();
    delivered.sort();
    assert_eq!(delivered, vec![2, 3]);
    assert_eq!(store.size().await.unwrap(), 1);
}

#[tokio::test]
async fn pending_envelope_is_delivered_once_eligible() {
    let sink = Arc::new(RecordingSink::new());
    let store = Arc::new(MemoryStore::new());
    let queue = DeliveryQueue::new("readiness", store.clone(), sink.clone(), &fast_config(2));

    let mut envelope = Envelope::text(8, None, "soon", Duration::from_secs(10));
    let eligible_at = Utc::now() + TimeDelta::milliseconds(150);
    envelope.next_eligible_at = eligible_at;
    queue.push(envelope).await.unwrap();
    queue.start();

    assert!(wait_until(Duration::from_secs(2), || queue.stats().delivered == 1).await);
    assert!(Utc::now() >= eligible_at);
    assert!(queue.stats().deferred >= 1);
    assert_eq!(sink.call_count(), 1);

    queue.shutdown().await.unwrap();
}
