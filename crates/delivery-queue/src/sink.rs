//! Delivery sink: the external endpoint performing one send attempt.

use async_trait::async_trait;
use thiserror::Error;

/// Why a delivery attempt failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// Transport failure (connect, timeout, TLS)
    #[error("Network error: {0}")]
    Network(String),

    /// The endpoint rejected our credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The endpoint refused the request
    #[error("Rejected ({code}): {description}")]
    Rejected { code: i64, description: String },

    /// The endpoint answered with something we could not decode
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// The message kind cannot be delivered by this sink
    #[error("Unsupported message type: {0}")]
    UnsupportedKind(String),
}

impl SinkError {
    /// Whether another attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, SinkError::UnsupportedKind(_))
    }
}

/// Result type for sink operations.
pub type SinkResult<T> = Result<T, SinkError>;

/// Performs outbound delivery attempts.
///
/// Each call is exactly one attempt; retrying is the queue's job.
#[async_trait]
pub trait DeliverySink: Send + Sync {
    /// Send a text message, optionally as a reply.
    async fn send_text(&self, chat_id: i64, reply_to: Option<i32>, body: &str) -> SinkResult<()>;

    /// Send a photo by URL. An empty caption means no caption.
    async fn send_photo(&self, chat_id: i64, url: &str, caption: &str) -> SinkResult<()>;
}
