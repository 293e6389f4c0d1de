//! Wiring of configuration, registry and sink.

use crate::error::{CourierError, CourierResult};
use delivery_queue::{
    store, DeliveryQueue, Envelope, QueueConfig, QueueRegistry, QueueStore, StatsSnapshot,
    StoreConfig, DEFAULT_ALIAS,
};
use std::sync::Arc;
use telegram_sink::{SinkConfig, TelegramSink};
use tracing::{error, info};

/// Consume the default queue until Ctrl-C, then shut down gracefully.
pub async fn run(config: QueueConfig, sink_config: SinkConfig) -> CourierResult<()> {
    let sink = Arc::new(TelegramSink::new(sink_config)?);
    let registry = QueueRegistry::new();
    let queue = registry.register(DEFAULT_ALIAS, config, sink).await?;

    info!(queue = %queue.alias(), pending = queue.size().await?, "Courier running");

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Received shutdown signal, draining...");

    let stats = drain(&registry, &queue).await?;

    info!(
        delivered = stats.delivered,
        retried = stats.retried,
        dropped = stats.dropped,
        "Courier stopped"
    );
    Ok(())
}

/// Shut every queue down and report `queue`'s final counters, including
/// attempts that finished while draining.
async fn drain(registry: &QueueRegistry, queue: &DeliveryQueue) -> CourierResult<StatsSnapshot> {
    registry.shutdown_all().await?;
    Ok(queue.stats())
}

/// Enqueue one envelope into a shared store and return.
///
/// Only the Redis store outlives this process, so it is the only one
/// accepted here.
pub async fn push(config: &QueueConfig, envelope: Envelope) -> CourierResult<()> {
    if !matches!(config.store, StoreConfig::Redis { .. }) {
        return Err(CourierError::Config(
            "pushing from the command line needs the redis store (--store redis)".to_string(),
        ));
    }
    config.validate()?;

    let store = store::open(&config.store)
        .await
        .map_err(delivery_queue::QueueError::from)?;
    let bytes = envelope.encode().map_err(delivery_queue::QueueError::from)?;
    store.push(bytes).await.map_err(delivery_queue::QueueError::from)?;

    info!(
        chat_id = envelope.chat_id,
        kind = envelope.kind.as_str(),
        pending = store.size().await.unwrap_or_default(),
        "Envelope enqueued"
    );
    Ok(())
}
