//! Blocking FIFO stores.
//!
//! Both backends honor the same contract: `push` appends to the tail,
//! `blocking_pop` waits for the head element, and after `close` every
//! current and future pop returns [`StoreError::Closed`].

mod memory;
mod redis_list;

pub use self::memory::MemoryStore;
pub use self::redis_list::RedisStore;

use crate::config::StoreConfig;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Store error type.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store has been closed
    #[error("Store is closed")]
    Closed,

    /// Redis connection or command error
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Pluggable blocking FIFO queue of opaque byte strings.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Append a value to the tail.
    async fn push(&self, value: Vec<u8>) -> StoreResult<()>;

    /// Remove and return the head, waiting until one exists or the store closes.
    async fn blocking_pop(&self) -> StoreResult<Vec<u8>>;

    /// Number of queued values.
    async fn size(&self) -> StoreResult<u64>;

    /// Close the store and wake every blocked caller.
    async fn close(&self) -> StoreResult<()>;
}

/// Open the store selected by `config`.
pub async fn open(config: &StoreConfig) -> StoreResult<Arc<dyn QueueStore>> {
    match config {
        StoreConfig::InProcess => Ok(Arc::new(MemoryStore::new())),
        StoreConfig::Redis {
            url,
            key,
            block_timeout,
        } => {
            let store = RedisStore::connect(url, key, *block_timeout).await?;
            Ok(Arc::new(store))
        }
    }
}
