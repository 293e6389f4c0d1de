//! Queue configuration.

use crate::error::{QueueError, QueueResult};
use crate::retry::RetryPolicy;
use std::str::FromStr;
use std::time::Duration;

/// Default Redis list key.
pub const DEFAULT_QUEUE_KEY: &str = "telegram:message";

/// Default Redis connection URL.
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// Default number of concurrent delivery slots.
pub const DEFAULT_POOL_SIZE: usize = 10;

/// Default BLPOP block timeout.
pub const DEFAULT_BLOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Which store implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// In-process list, single process only.
    InProcess,
    /// Shared Redis list.
    Redis,
}

impl FromStr for StoreBackend {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "in-process" | "memory" | "list" => Ok(StoreBackend::InProcess),
            "redis" => Ok(StoreBackend::Redis),
            other => Err(QueueError::Config(format!("Unknown store backend: {}", other))),
        }
    }
}

/// Store backend plus its connection parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    InProcess,
    Redis {
        /// Redis connection URL
        url: String,
        /// List key holding the queue
        key: String,
        /// Upper bound of a single BLPOP
        block_timeout: Duration,
    },
}

impl StoreConfig {
    /// Redis store with the default key and block timeout.
    pub fn redis(url: impl Into<String>) -> Self {
        StoreConfig::Redis {
            url: url.into(),
            key: DEFAULT_QUEUE_KEY.to_string(),
            block_timeout: DEFAULT_BLOCK_TIMEOUT,
        }
    }

    /// Redis store whose parameters come from the environment.
    ///
    /// - `REDIS_URL`: defaults to `redis://127.0.0.1:6379`
    /// - `DELIVERY_QUEUE_KEY`: defaults to `telegram:message`
    /// - `DELIVERY_BLOCK_SECS`: BLPOP timeout, defaults to 5
    pub fn redis_from_env() -> Self {
        Self::redis_from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`StoreConfig::redis_from_env`], reading variables through `lookup`.
    pub fn redis_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let url = lookup("REDIS_URL").unwrap_or_else(|| DEFAULT_REDIS_URL.to_string());
        let key = lookup("DELIVERY_QUEUE_KEY").unwrap_or_else(|| DEFAULT_QUEUE_KEY.to_string());
        let block_secs: u64 = lookup("DELIVERY_BLOCK_SECS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_BLOCK_TIMEOUT.as_secs());

        StoreConfig::Redis {
            url,
            key,
            block_timeout: Duration::from_secs(block_secs),
        }
    }

    /// The backend this configuration selects.
    pub fn backend(&self) -> StoreBackend {
        match self {
            StoreConfig::InProcess => StoreBackend::InProcess,
            StoreConfig::Redis { .. } => StoreBackend::Redis,
        }
    }
}

/// Sleeps used by the dispatch loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchTimings {
    /// Pause after a store error or an empty pop.
    pub idle_backoff: Duration,
    /// Lower bound of the jittered pause after requeueing a not-ready envelope.
    pub not_ready_min: Duration,
    /// Upper bound of that pause.
    pub not_ready_max: Duration,
}

impl Default for DispatchTimings {
    fn default() -> Self {
        Self {
            idle_backoff: Duration::from_secs(3),
            not_ready_min: Duration::from_secs(1),
            not_ready_max: Duration::from_secs(3),
        }
    }
}

/// Delivery queue configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    pub store: StoreConfig,
    /// Concurrent delivery slots
    pub pool_size: usize,
    pub retry: RetryPolicy,
    pub timings: DispatchTimings,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::InProcess,
            pool_size: DEFAULT_POOL_SIZE,
            retry: RetryPolicy::default(),
            timings: DispatchTimings::default(),
        }
    }
}

impl QueueConfig {
    /// Build a configuration from environment variables.
    ///
    /// - `DELIVERY_STORE`: `in-process` (default) or `redis`
    /// - Redis parameters as read by [`StoreConfig::redis_from_env`]
    /// - `DELIVERY_POOL_SIZE`: defaults to 10
    pub fn from_env() -> QueueResult<Self> {
        let backend: StoreBackend = std::env::var("DELIVERY_STORE")
            .ok()
            .map(|s| s.parse())
            .transpose()?
            .unwrap_or(StoreBackend::InProcess);

        let store = match backend {
            StoreBackend::InProcess => StoreConfig::InProcess,
            StoreBackend::Redis => StoreConfig::redis_from_env(),
        };

        let pool_size: usize = std::env::var("DELIVERY_POOL_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_POOL_SIZE);

        let config = Self {
            store,
            pool_size,
            ..Default::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that would prevent the queue from working.
    pub fn validate(&self) -> QueueResult<()> {
        if self.pool_size == 0 {
            return Err(QueueError::Config("pool_size must be at least 1".to_string()));
        }

        if self.retry.max_retries == 0 {
            return Err(QueueError::Config("retry.max_retries must be at least 1".to_string()));
        }

        if self.timings.not_ready_min > self.timings.not_ready_max {
            return Err(QueueError::Config(
                "timings.not_ready_min must not exceed timings.not_ready_max".to_string(),
            ));
        }

        if let StoreConfig::Redis {
            url,
            key,
            block_timeout,
        } = &self.store
        {
            if url.trim().is_empty() {
                return Err(QueueError::Config("Redis URL is required".to_string()));
            }
            if key.trim().is_empty() {
                return Err(QueueError::Config("Redis queue key is required".to_string()));
            }
            if block_timeout.is_zero() {
                // BLPOP 0 blocks forever and would never observe close().
                return Err(QueueError::Config("Redis block timeout must be positive".to_string()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = QueueConfig::default();
        assert_eq!(config.store, StoreConfig::InProcess);
        assert_eq!(config.pool_size, 10);
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.timings.idle_backoff, Duration::from_secs(3));
        assert_eq!(config.timings.not_ready_min, Duration::from_secs(1));
        assert_eq!(config.timings.not_ready_max, Duration::from_secs(3));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_store_backend_parse() {
        assert_eq!("redis".parse::<StoreBackend>().unwrap(), StoreBackend::Redis);
        assert_eq!("REDIS".parse::<StoreBackend>().unwrap(), StoreBackend::Redis);
        assert_eq!("in-process".parse::<StoreBackend>().unwrap(), StoreBackend::InProcess);
        assert_eq!("list".parse::<StoreBackend>().unwrap(), StoreBackend::InProcess);
        assert!("kafka".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn test_redis_store_defaults() {
        let store = StoreConfig::redis("redis://localhost:6379");
        assert_eq!(store.backend(), StoreBackend::Redis);
        assert_eq!(
            store,
            StoreConfig::Redis {
                url: "redis://localhost:6379".to_string(),
                key: "telegram:message".to_string(),
                block_timeout: Duration::from_secs(5),
            }
        );
    }

    #[test]
    fn test_redis_from_lookup_reads_variables() {
        let store = StoreConfig::redis_from_lookup(|name| match name {
            "REDIS_URL" => Some("redis://cache.internal:6380".to_string()),
            "DELIVERY_QUEUE_KEY" => Some("alerts".to_string()),
            "DELIVERY_BLOCK_SECS" => Some("2".to_string()),
            _ => None,
        });
        assert_eq!(
            store,
            StoreConfig::Redis {
                url: "redis://cache.internal:6380".to_string(),
                key: "alerts".to_string(),
                block_timeout: Duration::from_secs(2),
            }
        );
    }

    #[test]
    fn test_redis_from_lookup_falls_back_to_defaults() {
        let store = StoreConfig::redis_from_lookup(|name| match name {
            "DELIVERY_BLOCK_SECS" => Some("soon".to_string()),
            _ => None,
        });
        assert_eq!(store, StoreConfig::redis(DEFAULT_REDIS_URL));
    }

    #[test]
    fn test_validate_rejects_zero_pool() {
        let config = QueueConfig {
            pool_size: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(QueueError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_missing_redis_fields() {
        let missing_url = QueueConfig {
            store: StoreConfig::redis(""),
            ..Default::default()
        };
        assert!(matches!(missing_url.validate(), Err(QueueError::Config(_))));

        let missing_key = QueueConfig {
            store: StoreConfig::Redis {
                url: "redis://localhost".to_string(),
                key: " ".to_string(),
                block_timeout: Duration::from_secs(1),
            },
            ..Default::default()
        };
        assert!(matches!(missing_key.validate(), Err(QueueError::Config(_))));

        let zero_block = QueueConfig {
            store: StoreConfig::Redis {
                url: "redis://localhost".to_string(),
                key: "k".to_string(),
                block_timeout: Duration::ZERO,
            },
            ..Default::default()
        };
        assert!(matches!(zero_block.validate(), Err(QueueError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_inverted_jitter() {
        let config = QueueConfig {
            timings: DispatchTimings {
                idle_backoff: Duration::from_secs(1),
                not_ready_min: Duration::from_secs(5),
                not_ready_max: Duration::from_secs(1),
            },
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(QueueError::Config(_))));
    }
}
