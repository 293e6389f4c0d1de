//! Bounded worker pool performing one delivery attempt per submission.

use crate::envelope::{Envelope, MessageKind};
use crate::error::{QueueError, QueueResult};
use crate::retry::{RetryDecision, RetryPolicy};
use crate::sink::{DeliverySink, SinkError, SinkResult};
use crate::stats::DeliveryStats;
use crate::store::QueueStore;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, error, warn};

/// Result of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The sink accepted the message.
    Delivered,
    /// The attempt failed and the envelope was requeued with this delay.
    RetryScheduled(Duration),
    /// The envelope is gone for good.
    Dropped,
}

/// Performs a single attempt and applies the retry policy on failure.
pub struct DeliveryWorker {
    sink: Arc<dyn DeliverySink>,
    store: Arc<dyn QueueStore>,
    policy: RetryPolicy,
    stats: Arc<DeliveryStats>,
}

impl DeliveryWorker {
    pub fn new(
        sink: Arc<dyn DeliverySink>,
        store: Arc<dyn QueueStore>,
        policy: RetryPolicy,
        stats: Arc<DeliveryStats>,
    ) -> Self {
        Self {
            sink,
            store,
            policy,
            stats,
        }
    }

    /// Attempt delivery once.
    pub async fn attempt(&self, mut envelope: Envelope) -> AttemptOutcome {
        let error = match self.send(&envelope).await {
            Ok(()) => {
                debug!(
                    chat_id = envelope.chat_id,
                    kind = envelope.kind.as_str(),
                    attempt = envelope.attempt_count,
                    "Delivered"
                );
                self.stats.record_delivered();
                return AttemptOutcome::Delivered;
            }
            Err(e) => e,
        };

        if !error.is_retryable() {
            error!(
                chat_id = envelope.chat_id,
                error = %error,
                "Dropping undeliverable envelope"
            );
            self.stats.record_dropped();
            return AttemptOutcome::Dropped;
        }

        let delay = match self.policy.decide(envelope.attempt_count) {
            RetryDecision::Drop => {
                error!(
                    chat_id = envelope.chat_id,
                    kind = envelope.kind.as_str(),
                    attempts = envelope.attempt_count.saturating_add(1),
                    error = %error,
                    "Retries exhausted, dropping envelope"
                );
                self.stats.record_dropped();
                return AttemptOutcome::Dropped;
            }
            RetryDecision::Retry(delay) => delay,
        };

        let fallback = envelope.raw().map(<[u8]>::to_vec);
        envelope.schedule_retry(delay, Utc::now());

        if let Err(e) = self.requeue(&envelope, fallback).await {
            error!(
                chat_id = envelope.chat_id,
                attempt = envelope.attempt_count,
                error = %e,
                "Failed to requeue envelope, message lost"
            );
            self.stats.record_dropped();
            return AttemptOutcome::Dropped;
        }

        warn!(
            chat_id = envelope.chat_id,
            attempt = envelope.attempt_count,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "Delivery failed, retry scheduled"
        );
        self.stats.record_retried();
        AttemptOutcome::RetryScheduled(delay)
    }

    async fn send(&self, envelope: &Envelope) -> SinkResult<()> {
        match &envelope.kind {
            MessageKind::Text { body } => {
                self.sink.send_text(envelope.chat_id, envelope.reply_to, body).await
            }
            MessageKind::Photo { url, caption } => {
                self.sink.send_photo(envelope.chat_id, url, caption).await
            }
            MessageKind::Unsupported { kind } => Err(SinkError::UnsupportedKind(kind.clone())),
        }
    }

    /// Push the updated envelope as a new store entry. If it cannot be
    /// encoded, the bytes it was read as are pushed instead.
    async fn requeue(&self, envelope: &Envelope, fallback: Option<Vec<u8>>) -> QueueResult<()> {
        let bytes = match (envelope.encode(), fallback) {
            (Ok(bytes), _) => bytes,
            (Err(e), Some(raw)) => {
                warn!(
                    chat_id = envelope.chat_id,
                    error = %e,
                    "Re-encoding failed, requeueing raw form"
                );
                raw
            }
            (Err(e), None) => return Err(e.into()),
        };

        self.store.push(bytes).await?;
        Ok(())
    }
}

/// Fixed number of delivery slots.
///
/// Submitting while every slot is busy waits for one to free up, so a slow
/// sink throttles the dispatcher instead of losing work.
pub struct WorkerPool {
    slots: Arc<Semaphore>,
    capacity: usize,
    worker: Arc<DeliveryWorker>,
}

impl WorkerPool {
    /// Create a pool with `capacity` slots.
    pub fn new(capacity: usize, worker: DeliveryWorker) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(capacity)),
            capacity,
            worker: Arc::new(worker),
        }
    }

    /// Run one attempt for `envelope` on a free slot.
    ///
    /// Returns once the attempt has started, not when it completes.
    pub async fn submit(&self, envelope: Envelope) -> QueueResult<()> {
        let permit = self
            .slots
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| QueueError::PoolClosed)?;

        let worker = self.worker.clone();
        tokio::spawn(async move {
            worker.attempt(envelope).await;
            drop(permit);
        });

        Ok(())
    }

    /// Total slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently running an attempt.
    pub fn in_flight(&self) -> usize {
        self.capacity.saturating_sub(self.slots.available_permits())
    }

    /// Wait for every in-flight attempt, then refuse further submissions.
    pub async fn drain(&self) {
        let permits = u32::try_from(self.capacity).unwrap_or(u32::MAX);
        if let Ok(all) = self.slots.acquire_many(permits).await {
            all.forget();
        }
        self.slots.close();
        debug!(capacity = self.capacity, "Worker pool drained");
    }
}
