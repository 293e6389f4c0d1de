//! Sink configuration.

use crate::error::{SinkConfigError, SinkConfigResult};
use std::fmt;
use std::time::Duration;

/// Default Bot API endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for the Bot API.
#[derive(Clone, PartialEq, Eq)]
pub struct SinkConfig {
    /// Bot token issued by BotFather
    pub token: String,
    /// Scheme and host of the API, without the `/bot<token>` suffix
    pub api_base: String,
    /// Upper bound for one request, connect included
    pub timeout: Duration,
}

impl SinkConfig {
    /// Configuration with the default endpoint and timeout.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Build a configuration from environment variables.
    ///
    /// - `TELEGRAM_BOT_TOKEN`: required
    /// - `TELEGRAM_API_BASE`: defaults to `https://api.telegram.org`
    /// - `TELEGRAM_TIMEOUT_SECS`: defaults to 30
    pub fn from_env() -> SinkConfigResult<Self> {
        let token =
            std::env::var("TELEGRAM_BOT_TOKEN").map_err(|_| SinkConfigError::MissingToken)?;
        let api_base =
            std::env::var("TELEGRAM_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        let timeout_secs: u64 = std::env::var("TELEGRAM_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT.as_secs());

        let config = Self {
            token,
            api_base,
            timeout: Duration::from_secs(timeout_secs),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SinkConfigResult<()> {
        if self.token.trim().is_empty() {
            return Err(SinkConfigError::MissingToken);
        }

        let base = self.api_base.trim();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(SinkConfigError::InvalidApiBase(self.api_base.clone()));
        }

        if self.timeout.is_zero() {
            return Err(SinkConfigError::ZeroTimeout);
        }

        Ok(())
    }

    /// Full URL of a Bot API method.
    pub(crate) fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.api_base.trim().trim_end_matches('/'),
            self.token.trim(),
            method
        )
    }
}

// The token grants full control of the bot; keep it out of logs.
impl fmt::Debug for SinkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkConfig")
            .field("token", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SinkConfig::new("123:abc");
        assert_eq!(config.api_base, "https://api.telegram.org");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_method_url() {
        let mut config = SinkConfig::new("123:abc");
        assert_eq!(
            config.method_url("sendMessage"),
            "https://api.telegram.org/bot123:abc/sendMessage"
        );

        config.api_base = "http://localhost:8081/".to_string();
        assert_eq!(config.method_url("sendPhoto"), "http://localhost:8081/bot123:abc/sendPhoto");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(matches!(SinkConfig::new("  ").validate(), Err(SinkConfigError::MissingToken)));

        let mut config = SinkConfig::new("123:abc");
        config.api_base = "api.telegram.org".to_string();
        assert!(matches!(config.validate(), Err(SinkConfigError::InvalidApiBase(_))));

        let mut config = SinkConfig::new("123:abc");
        config.timeout = Duration::ZERO;
        assert!(matches!(config.validate(), Err(SinkConfigError::ZeroTimeout)));
    }

    #[test]
    fn test_debug_redacts_token() {
        let rendered = format!("{:?}", SinkConfig::new("123:secret"));
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
