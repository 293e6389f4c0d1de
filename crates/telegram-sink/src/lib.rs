//! Telegram Bot API sink.
//!
//! Implements [`delivery_queue::DeliverySink`] over the `sendMessage` and
//! `sendPhoto` methods. Every call is a single HTTP request; retrying is left
//! to the queue.

mod api;
pub mod client;
pub mod config;
pub mod error;

pub use client::TelegramSink;
pub use config::{SinkConfig, DEFAULT_API_BASE, DEFAULT_TIMEOUT};
pub use error::{SinkConfigError, SinkConfigResult};
