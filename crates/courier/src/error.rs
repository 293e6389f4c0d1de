//! Error types for Courier.

use thiserror::Error;

/// Courier error type.
#[derive(Error, Debug)]
pub enum CourierError {
    /// Queue setup or store failure
    #[error("Queue error: {0}")]
    Queue(#[from] delivery_queue::QueueError),

    /// Sink could not be built
    #[error("Sink error: {0}")]
    Sink(#[from] telegram_sink::SinkConfigError),

    /// Invalid command-line or environment configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Logging could not be initialized
    #[error("Logging error: {0}")]
    Logging(String),
}

/// Result type for Courier operations.
pub type CourierResult<T> = Result<T, CourierError>;
