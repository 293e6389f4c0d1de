//! Shared store backed by a Redis list (RPUSH / BLPOP).
//!
//! Several producer and consumer processes can point at the same key to
//! share one logical queue.

use super::{QueueStore, StoreError, StoreResult};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, RedisResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Redis list store.
pub struct RedisStore {
    key: String,
    block_timeout: Duration,
    /// Connection for non-blocking commands.
    conn: MultiplexedConnection,
    /// Dedicated connection for BLPOP so a parked pop never stalls pushes.
    pop_conn: Mutex<MultiplexedConnection>,
    closed: AtomicBool,
}

impl RedisStore {
    /// Connect to Redis and verify the connection with PING.
    ///
    /// `block_timeout` bounds each BLPOP round trip, and therefore how long
    /// a blocked pop takes to observe `close`.
    pub async fn connect(url: &str, key: &str, block_timeout: Duration) -> StoreResult<Self> {
        let client = Client::open(url)?;
        let mut conn = client.get_multiplexed_async_connection().await?;
        let pop_conn = client.get_multiplexed_async_connection().await?;

        let pong: RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;
        pong?;

        info!(
            key = %key,
            block_timeout_ms = block_timeout.as_millis() as u64,
            "Connected to Redis store"
        );

        Ok(Self {
            key: key.to_string(),
            block_timeout,
            conn,
            pop_conn: Mutex::new(pop_conn),
            closed: AtomicBool::new(false),
        })
    }

    /// The list key backing this store.
    pub fn key(&self) -> &str {
        &self.key
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueueStore for RedisStore {
    async fn push(&self, value: Vec<u8>) -> StoreResult<()> {
        if self.is_closed() {
            return Err(StoreError::Closed);
        }

        let mut conn = self.conn.clone();
        let len: u64 = conn.rpush(&self.key, value.as_slice()).await?;
        debug!(key = %self.key, len, "Pushed value");
        Ok(())
    }

    async fn blocking_pop(&self) -> StoreResult<Vec<u8>> {
        let mut conn = self.pop_conn.lock().await;
        let timeout_secs = self.block_timeout.as_secs_f64();

        loop {
            if self.is_closed() {
                return Err(StoreError::Closed);
            }

            // BLPOP replies [key, value], or nil once the block timeout expires.
            let popped: Option<(String, Vec<u8>)> = conn.blpop(&self.key, timeout_secs).await?;

            let Some((_, value)) = popped else {
                continue;
            };

            if self.is_closed() {
                // Closed while parked: put the value back at the head so the
                // shared queue loses nothing.
                let restored: RedisResult<u64> = conn.lpush(&self.key, value.as_slice()).await;
                if let Err(e) = restored {
                    warn!(
                        key = %self.key,
                        error = %e,
                        "Failed to restore value popped during close"
                    );
                    return Err(e.into());
                }
                return Err(StoreError::Closed);
            }

            return Ok(value);
        }
    }

    async fn size(&self) -> StoreResult<u64> {
        let mut conn = self.conn.clone();
        let len: u64 = conn.llen(&self.key).await?;
        Ok(len)
    }

    async fn close(&self) -> StoreResult<()> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!(key = %self.key, "Closed Redis store");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! These tests need a running Redis; run with `cargo test -- --ignored`.

    use super::*;
    use std::sync::Arc;
    use tokio::time::timeout;

    fn redis_url() -> String {
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
    }

    async fn fresh_store(key: &str) -> RedisStore {
        let store = RedisStore::connect(&redis_url(), key, Duration::from_millis(200))
            .await
            .unwrap();
        let mut conn = store.conn.clone();
        let _: () = conn.del(key).await.unwrap();
        store
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_redis_fifo_order() {
        let store = fresh_store("delivery-queue:test:fifo").await;
        for value in [b"e1", b"e2", b"e3"] {
            store.push(value.to_vec()).await.unwrap();
        }
        assert_eq!(store.size().await.unwrap(), 3);

        assert_eq!(store.blocking_pop().await.unwrap(), b"e1");
        assert_eq!(store.blocking_pop().await.unwrap(), b"e2");
        assert_eq!(store.blocking_pop().await.unwrap(), b"e3");
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_redis_close_wakes_blocked_pop() {
        let store = Arc::new(fresh_store("delivery-queue:test:close").await);

        let popper = {
            let store = store.clone();
            tokio::spawn(async move { store.blocking_pop().await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        store.close().await.unwrap();

        let result = timeout(Duration::from_secs(2), popper).await.unwrap().unwrap();
        assert!(matches!(result, Err(StoreError::Closed)));
        assert!(matches!(store.push(b"x".to_vec()).await, Err(StoreError::Closed)));
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_redis_two_handles_share_one_queue() {
        let key = "delivery-queue:test:shared";
        let producer = fresh_store(key).await;
        let consumer = RedisStore::connect(&redis_url(), key, Duration::from_millis(200))
            .await
            .unwrap();

        producer.push(b"shared".to_vec()).await.unwrap();
        assert_eq!(consumer.blocking_pop().await.unwrap(), b"shared");
    }
}
