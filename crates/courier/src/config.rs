//! Command-line overrides layered on top of environment configuration.
//!
//! The queue and sink configurations are first read from the environment
//! by their own crates; any flag given on the command line replaces the
//! corresponding value.

use crate::error::{CourierError, CourierResult};
use clap::Args;
use delivery_queue::{QueueConfig, StoreBackend, StoreConfig};
use std::time::Duration;
use telegram_sink::{SinkConfig, DEFAULT_API_BASE, DEFAULT_TIMEOUT};

/// Queue flags shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct QueueOverrides {
    /// Store backend: in-process or redis.
    #[arg(long, global = true)]
    pub store: Option<StoreBackend>,

    /// Redis connection URL.
    #[arg(long, global = true)]
    pub redis_url: Option<String>,

    /// Redis list key holding the queue.
    #[arg(long, global = true)]
    pub queue_key: Option<String>,

    /// Concurrent delivery slots.
    #[arg(long, global = true)]
    pub pool_size: Option<usize>,
}

impl QueueOverrides {
    /// Apply the flags to `base` and validate the result.
    ///
    /// Switching to the redis store with `--store` picks up the Redis
    /// variables from the environment, as `DELIVERY_STORE=redis` would.
    pub fn apply(&self, base: QueueConfig) -> CourierResult<QueueConfig> {
        self.apply_with(base, |name| std::env::var(name).ok())
    }

    /// Like [`QueueOverrides::apply`], reading variables through `lookup`.
    pub fn apply_with(
        &self,
        base: QueueConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> CourierResult<QueueConfig> {
        let mut config = base;

        if let Some(backend) = self.store {
            if backend != config.store.backend() {
                config.store = match backend {
                    StoreBackend::InProcess => StoreConfig::InProcess,
                    StoreBackend::Redis => StoreConfig::redis_from_lookup(lookup),
                };
            }
        }

        if let StoreConfig::Redis { url, key, .. } = &mut config.store {
            if let Some(redis_url) = &self.redis_url {
                *url = redis_url.clone();
            }
            if let Some(queue_key) = &self.queue_key {
                *key = queue_key.clone();
            }
        } else if self.redis_url.is_some() || self.queue_key.is_some() {
            return Err(CourierError::Config(
                "--redis-url and --queue-key require the redis store".to_string(),
            ));
        }

        if let Some(pool_size) = self.pool_size {
            config.pool_size = pool_size;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Telegram flags for the `run` subcommand.
#[derive(Args, Debug, Clone)]
pub struct SinkOverrides {
    /// Bot token.
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Bot API base URL.
    #[arg(long, env = "TELEGRAM_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// Request timeout in seconds.
    #[arg(long, env = "TELEGRAM_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT.as_secs())]
    pub timeout_secs: u64,
}

impl SinkOverrides {
    pub fn to_config(&self) -> CourierResult<SinkConfig> {
        let token = self
            .token
            .clone()
            .ok_or(CourierError::Sink(telegram_sink::SinkConfigError::MissingToken))?;

        let config = SinkConfig {
            token,
            api_base: self.api_base.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Destination of a pushed message.
#[derive(Args, Debug, Clone)]
pub struct PushTarget {
    /// Destination chat id.
    #[arg(long, allow_negative_numbers = true)]
    pub chat_id: i64,

    /// Message id to reply to.
    #[arg(long)]
    pub reply_to: Option<i32>,
}
