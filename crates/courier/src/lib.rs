//! Courier: runs a delivery queue in front of the Telegram Bot API.
//!
//! The `run` mode consumes the queue and delivers through
//! [`telegram_sink::TelegramSink`]. The push modes enqueue a single message
//! into a shared store and exit, so any process that can reach the store
//! can produce messages for a running consumer.

pub mod app;
pub mod config;
pub mod error;
pub mod logging;

pub use app::{push, run};
pub use config::{PushTarget, QueueOverrides, SinkOverrides};
pub use error::{CourierError, CourierResult};
pub use logging::{LogConfig, LogFormat};
