//! Delivery counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by the dispatch loop and the workers.
#[derive(Debug, Default)]
pub struct DeliveryStats {
    delivered: AtomicU64,
    retried: AtomicU64,
    dropped: AtomicU64,
    discarded: AtomicU64,
    deferred: AtomicU64,
}

/// Point-in-time copy of [`DeliveryStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Successful deliveries.
    pub delivered: u64,
    /// Failed attempts that were requeued.
    pub retried: u64,
    /// Envelopes given up on (retries exhausted or unsupported kind).
    pub dropped: u64,
    /// Malformed store entries thrown away.
    pub discarded: u64,
    /// Not-yet-eligible envelopes pushed back to the tail.
    pub deferred: u64,
}

impl DeliveryStats {
    pub fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retried(&self) {
        self.retried.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_discarded(&self) {
        self.discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_deferred(&self) {
        self.deferred.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            delivered: self.delivered.load(Ordering::Relaxed),
            retried: self.retried.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            deferred: self.deferred.load(Ordering::Relaxed),
        }
    }
}
