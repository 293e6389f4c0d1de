//! Dispatch loop draining the store into the worker pool.
//!
//! Delayed retries use the store itself: an envelope popped before its
//! eligibility time is pushed back, byte-identical, to the tail. With more
//! than one queued item readiness is therefore approximate, and a lone
//! pending envelope costs one cheap pop/push cycle per jittered sleep.
//! The Redis backend is shared across processes, so an in-memory timer
//! structure here could not see envelopes held by other consumers.

use crate::config::DispatchTimings;
use crate::envelope::Envelope;
use crate::pool::WorkerPool;
use crate::retry::RetryPolicy;
use crate::stats::DeliveryStats;
use crate::store::{QueueStore, StoreError};
use chrono::Utc;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// What one iteration of the loop did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// A ready envelope was handed to the pool.
    Dispatched,
    /// A not-yet-eligible envelope went back to the tail.
    Deferred,
    /// A malformed entry was thrown away.
    Discarded,
    /// The store failed or returned nothing.
    Idle,
    /// The store is closed; the loop should stop.
    Closed,
}

/// Single consumer of a queue's store.
pub struct Dispatcher {
    store: Arc<dyn QueueStore>,
    pool: Arc<WorkerPool>,
    policy: RetryPolicy,
    timings: DispatchTimings,
    stats: Arc<DeliveryStats>,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn QueueStore>,
        pool: Arc<WorkerPool>,
        policy: RetryPolicy,
        timings: DispatchTimings,
        stats: Arc<DeliveryStats>,
    ) -> Self {
        Self {
            store,
            pool,
            policy,
            timings,
            stats,
        }
    }

    /// Run until the store is closed.
    ///
    /// Transient store errors are retried after `idle_backoff`; a closed
    /// store ends the loop.
    pub async fn run(&self) {
        info!(pool_size = self.pool.capacity(), "Starting dispatch loop");

        loop {
            match self.step().await {
                Step::Dispatched | Step::Discarded => {}
                Step::Deferred => tokio::time::sleep(self.not_ready_pause()).await,
                Step::Idle => tokio::time::sleep(self.timings.idle_backoff).await,
                Step::Closed => break,
            }
        }

        info!("Dispatch loop stopped");
    }

    /// Pop one entry and route it.
    pub async fn step(&self) -> Step {
        let bytes = match self.store.blocking_pop().await {
            Ok(bytes) => bytes,
            Err(StoreError::Closed) => return Step::Closed,
            Err(e) => {
                warn!(error = %e, "Store pop failed, backing off");
                return Step::Idle;
            }
        };

        if bytes.is_empty() {
            return Step::Idle;
        }

        let mut envelope = match Envelope::decode(&bytes) {
            Ok(envelope) => envelope,
            Err(e) => {
                error!(
                    origin = %String::from_utf8_lossy(&bytes),
                    error = %e,
                    "Discarding malformed envelope"
                );
                self.stats.record_discarded();
                return Step::Discarded;
            }
        };

        if !envelope.is_ready(Utc::now()) {
            // Push the original bytes back untouched.
            if let Err(e) = self.store.push(bytes).await {
                error!(
                    chat_id = envelope.chat_id,
                    error = %e,
                    "Failed to requeue pending envelope, message lost"
                );
                return if matches!(e, StoreError::Closed) {
                    Step::Closed
                } else {
                    Step::Idle
                };
            }
            self.stats.record_deferred();
            return Step::Deferred;
        }

        envelope.retry_interval =
            u32::try_from(self.policy.base_interval.as_secs()).unwrap_or(u32::MAX);

        debug!(
            chat_id = envelope.chat_id,
            attempt = envelope.attempt_count,
            in_flight = self.pool.in_flight(),
            "Dispatching envelope"
        );

        // Blocks while every slot is busy.
        if let Err(e) = self.pool.submit(envelope).await {
            error!(error = %e, "Worker pool rejected envelope");
            return Step::Closed;
        }

        Step::Dispatched
    }

    fn not_ready_pause(&self) -> Duration {
        let DispatchTimings {
            not_ready_min,
            not_ready_max,
            ..
        } = self.timings;

        if not_ready_min >= not_ready_max {
            return not_ready_min;
        }
        rand::thread_rng().gen_range(not_ready_min..=not_ready_max)
    }
}
