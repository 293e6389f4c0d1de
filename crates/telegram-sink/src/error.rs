//! Error types for building a Telegram sink.

use thiserror::Error;

/// Errors that prevent a sink from being built.
#[derive(Error, Debug)]
pub enum SinkConfigError {
    /// No bot token was supplied
    #[error("Missing Telegram bot token")]
    MissingToken,

    /// The API base is not an http(s) URL
    #[error("Invalid API base URL: {0}")]
    InvalidApiBase(String),

    /// The request timeout is zero
    #[error("Request timeout must be positive")]
    ZeroTimeout,

    /// The HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// Result type alias using SinkConfigError.
pub type SinkConfigResult<T> = Result<T, SinkConfigError>;
