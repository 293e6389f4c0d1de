//! Retry-aware outbound delivery queue.
//!
//! Producers push message envelopes into a blocking FIFO store and return
//! immediately. A single dispatch loop per queue drains the store and hands
//! each ready envelope to a bounded worker pool, which performs exactly one
//! delivery attempt through a [`DeliverySink`] and requeues failures with a
//! delay chosen by the [`RetryPolicy`].
//!
//! # Architecture
//!
//! ```text
//! producer -> Store.push -> Dispatcher.pop -> [not ready? requeue + sleep]
//!                                 |
//!                                 v
//!                          WorkerPool.submit -> DeliverySink.send
//!                                                 |
//!                     success: done  <------------+------------> failure:
//!                                                   RetryPolicy -> drop | Store.push
//! ```
//!
//! # Core Invariants
//!
//! 1. **Fire-and-forget**: producers only ever see store-level errors
//! 2. **Bounded retries**: an envelope is attempted at most `max_retries + 1` times
//! 3. **Backpressure**: a saturated pool blocks the dispatcher, it never drops work
//! 4. **Single loop**: starting a queue twice never spawns a second dispatcher

pub mod config;
pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod pool;
pub mod registry;
pub mod retry;
pub mod sink;
pub mod stats;
pub mod store;

#[cfg(test)]
mod tests;

pub use config::{DispatchTimings, QueueConfig, StoreBackend, StoreConfig};
pub use dispatcher::{Dispatcher, Step};
pub use envelope::{Envelope, MessageKind};
pub use error::{QueueError, QueueResult};
pub use pool::{AttemptOutcome, DeliveryWorker, WorkerPool};
pub use registry::{DeliveryQueue, QueueRegistry, DEFAULT_ALIAS};
pub use retry::{RetryDecision, RetryPolicy};
pub use sink::{DeliverySink, SinkError, SinkResult};
pub use stats::{DeliveryStats, StatsSnapshot};
pub use store::{MemoryStore, QueueStore, RedisStore, StoreError, StoreResult};
