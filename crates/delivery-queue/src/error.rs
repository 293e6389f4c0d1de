//! Queue error types.

use crate::store::StoreError;
use thiserror::Error;

/// Delivery queue error type.
#[derive(Error, Debug)]
pub enum QueueError {
    /// Backing store failure (including a closed store)
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Envelope could not be encoded or decoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration, fatal to registration
    #[error("Configuration error: {0}")]
    Config(String),

    /// The worker pool no longer accepts submissions
    #[error("Worker pool is closed")]
    PoolClosed,

    /// No queue registered under the alias
    #[error("No queue registered under alias '{0}'")]
    NotRegistered(String),
}

/// Result type alias using QueueError.
pub type QueueResult<T> = Result<T, QueueError>;
