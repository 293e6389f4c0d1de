//! Queue handles and the registry that owns them.

use crate::config::QueueConfig;
use crate::dispatcher::Dispatcher;
use crate::envelope::Envelope;
use crate::error::{QueueError, QueueResult};
use crate::pool::{DeliveryWorker, WorkerPool};
use crate::sink::DeliverySink;
use crate::stats::{DeliveryStats, StatsSnapshot};
use crate::store::{self, QueueStore};
use std::collections::HashMap;
use std::sync::{Arc, Once};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Alias used when callers do not name a queue.
pub const DEFAULT_ALIAS: &str = "default";

/// A running (or startable) delivery queue.
pub struct DeliveryQueue {
    alias: String,
    store: Arc<dyn QueueStore>,
    pool: Arc<WorkerPool>,
    dispatcher: Arc<Dispatcher>,
    stats: Arc<DeliveryStats>,
    retry_interval: Duration,
    started: Once,
    dispatch_task: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl DeliveryQueue {
    /// Assemble a queue over an already opened store. Does not start it.
    pub fn new(
        alias: &str,
        store: Arc<dyn QueueStore>,
        sink: Arc<dyn DeliverySink>,
        config: &QueueConfig,
    ) -> Self {
        let stats = Arc::new(DeliveryStats::default());
        let worker = DeliveryWorker::new(sink, store.clone(), config.retry.clone(), stats.clone());
        let pool = Arc::new(WorkerPool::new(config.pool_size, worker));
        let dispatcher = Arc::new(Dispatcher::new(
            store.clone(),
            pool.clone(),
            config.retry.clone(),
            config.timings.clone(),
            stats.clone(),
        ));

        Self {
            alias: alias.to_string(),
            store,
            pool,
            dispatcher,
            stats,
            retry_interval: config.retry.base_interval,
            started: Once::new(),
            dispatch_task: parking_lot::Mutex::new(None),
        }
    }

    /// Validate `config`, open its store and assemble a queue.
    pub async fn open(
        alias: &str,
        config: &QueueConfig,
        sink: Arc<dyn DeliverySink>,
    ) -> QueueResult<Self> {
        config.validate()?;
        let store = store::open(&config.store).await?;
        Ok(Self::new(alias, store, sink, config))
    }

    /// The alias this queue was created under.
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Spawn the dispatch loop. Only the first call has any effect.
    ///
    /// Must be called from within a Tokio runtime. Returns whether this
    /// call started the loop.
    pub fn start(&self) -> bool {
        let mut started_now = false;

        self.started.call_once(|| {
            let dispatcher = self.dispatcher.clone();
            let task = tokio::spawn(async move { dispatcher.run().await });
            *self.dispatch_task.lock() = Some(task);
            started_now = true;
        });

        if started_now {
            info!(queue = %self.alias, pool_size = self.pool.capacity(), "Delivery queue started");
        } else {
            debug!(queue = %self.alias, "Delivery queue already started");
        }
        started_now
    }

    /// Whether the dispatch loop is currently running.
    pub fn is_running(&self) -> bool {
        self.dispatch_task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Enqueue an envelope. Only store failures are reported.
    pub async fn push(&self, envelope: Envelope) -> QueueResult<()> {
        let bytes = envelope.encode()?;
        self.store.push(bytes).await?;
        debug!(queue = %self.alias, chat_id = envelope.chat_id, "Enqueued envelope");
        Ok(())
    }

    /// Enqueue a text message.
    pub async fn push_text(
        &self,
        chat_id: i64,
        reply_to: Option<i32>,
        body: &str,
    ) -> QueueResult<()> {
        self.push(Envelope::text(chat_id, reply_to, body, self.retry_interval)).await
    }

    /// Enqueue a photo message.
    pub async fn push_photo(
        &self,
        chat_id: i64,
        reply_to: Option<i32>,
        url: &str,
        caption: &str,
    ) -> QueueResult<()> {
        self.push(Envelope::photo(chat_id, reply_to, url, caption, self.retry_interval))
            .await
    }

    /// Entries currently held by the store.
    pub async fn size(&self) -> QueueResult<u64> {
        Ok(self.store.size().await?)
    }

    /// Delivery counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Attempts currently running.
    pub fn in_flight(&self) -> usize {
        self.pool.in_flight()
    }

    /// Close the store, wait for the dispatch loop to exit and for
    /// in-flight attempts to finish.
    ///
    /// Attempts that fail while shutting down cannot be requeued into the
    /// closed store and are dropped.
    pub async fn shutdown(&self) -> QueueResult<()> {
        self.store.close().await?;

        let task = self.dispatch_task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(queue = %self.alias, error = %e, "Dispatch loop ended abnormally");
            }
        }

        self.pool.drain().await;
        info!(queue = %self.alias, stats = ?self.stats(), "Delivery queue shut down");
        Ok(())
    }
}

/// Owns every queue of the application, keyed by alias.
#[derive(Default)]
pub struct QueueRegistry {
    queues: RwLock<HashMap<String, Arc<DeliveryQueue>>>,
}

impl QueueRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create, start and register a queue.
    ///
    /// An invalid configuration fails registration and nothing is started.
    /// If `alias` is already registered the existing queue is returned and
    /// `config` is ignored. The store is opened without holding the registry
    /// lock, so a slow Redis does not stall lookups; if another caller wins
    /// the race for the same alias, the queue opened here is discarded
    /// unstarted.
    pub async fn register(
        &self,
        alias: &str,
        config: QueueConfig,
        sink: Arc<dyn DeliverySink>,
    ) -> QueueResult<Arc<DeliveryQueue>> {
        let existing = self.queues.read().await.get(alias).cloned();
        if let Some(existing) = existing {
            warn!(queue = %alias, "Queue already registered, keeping the running instance");
            return Ok(existing);
        }

        let queue = Arc::new(DeliveryQueue::open(alias, &config, sink).await?);

        let mut queues = self.queues.write().await;
        if let Some(existing) = queues.get(alias) {
            warn!(queue = %alias, "Queue registered concurrently, discarding the new instance");
            return Ok(existing.clone());
        }

        queue.start();
        queues.insert(alias.to_string(), queue.clone());

        info!(queue = %alias, backend = ?config.store.backend(), "Registered delivery queue");
        Ok(queue)
    }

    /// Look up a queue by alias.
    pub async fn get(&self, alias: &str) -> QueueResult<Arc<DeliveryQueue>> {
        self.queues
            .read()
            .await
            .get(alias)
            .cloned()
            .ok_or_else(|| QueueError::NotRegistered(alias.to_string()))
    }

    /// The queue registered under [`DEFAULT_ALIAS`].
    pub async fn default_queue(&self) -> QueueResult<Arc<DeliveryQueue>> {
        self.get(DEFAULT_ALIAS).await
    }

    /// Registered aliases, sorted.
    pub async fn aliases(&self) -> Vec<String> {
        let mut aliases: Vec<String> = self.queues.read().await.keys().cloned().collect();
        aliases.sort();
        aliases
    }

    /// Unregister a queue without shutting it down.
    pub async fn remove(&self, alias: &str) -> Option<Arc<DeliveryQueue>> {
        let removed = self.queues.write().await.remove(alias);
        if removed.is_some() {
            info!(queue = %alias, "Removed delivery queue");
        }
        removed
    }

    /// Shut down and unregister every queue.
    pub async fn shutdown_all(&self) -> QueueResult<()> {
        let queues: Vec<Arc<DeliveryQueue>> =
            self.queues.write().await.drain().map(|(_, q)| q).collect();

        for queue in queues {
            queue.shutdown().await?;
        }
        Ok(())
    }
}
