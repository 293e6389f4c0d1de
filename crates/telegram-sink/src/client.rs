//! HTTP client for the Bot API.

use crate::api::{ApiResponse, ReplyParameters, SendMessageRequest, SendPhotoRequest};
use crate::config::SinkConfig;
use crate::error::SinkConfigResult;
use async_trait::async_trait;
use delivery_queue::{DeliverySink, SinkError, SinkResult};
use reqwest::StatusCode;
use serde::Serialize;

/// Delivers envelopes through the Telegram Bot API.
#[derive(Clone, Debug)]
pub struct TelegramSink {
    http_client: reqwest::Client,
    config: SinkConfig,
}

impl TelegramSink {
    /// Validate `config` and build the HTTP client.
    pub fn new(config: SinkConfig) -> SinkConfigResult<Self> {
        config.validate()?;
        let http_client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http_client, config })
    }

    pub fn config(&self) -> &SinkConfig {
        &self.config
    }

    /// POST one Bot API method and interpret the response envelope.
    async fn call<T: Serialize>(&self, method: &str, payload: &T) -> SinkResult<()> {
        let response = self
            .http_client
            .post(self.config.method_url(method))
            .json(payload)
            .send()
            .await
            .map_err(|e| SinkError::Network(e.without_url().to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| SinkError::Network(e.without_url().to_string()))?;

        let parsed: Result<ApiResponse, _> = serde_json::from_slice(&body);

        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            let description = parsed
                .ok()
                .and_then(|r| r.description)
                .unwrap_or_else(|| status.to_string());
            return Err(SinkError::Unauthorized(description));
        }

        let parsed = parsed.map_err(|e| {
            tracing::error!(
                method,
                status = status.as_u16(),
                error = %e,
                "Undecodable Bot API response"
            );
            SinkError::Decode(format!("HTTP {}: {}", status.as_u16(), e))
        })?;

        if parsed.ok {
            return Ok(());
        }

        let code = parsed.error_code.unwrap_or_else(|| i64::from(status.as_u16()));
        let description = parsed.description.unwrap_or_default();
        tracing::warn!(method, code, description = %description, "Bot API rejected request");

        if code == 401 || code == 403 {
            return Err(SinkError::Unauthorized(description));
        }
        Err(SinkError::Rejected { code, description })
    }
}

#[async_trait]
impl DeliverySink for TelegramSink {
    async fn send_text(&self, chat_id: i64, reply_to: Option<i32>, body: &str) -> SinkResult<()> {
        let request = SendMessageRequest {
            chat_id,
            text: body,
            reply_parameters: reply_to
                .filter(|id| *id > 0)
                .map(|message_id| ReplyParameters { message_id }),
        };
        self.call("sendMessage", &request).await
    }

    async fn send_photo(&self, chat_id: i64, url: &str, caption: &str) -> SinkResult<()> {
        let request = SendPhotoRequest {
            chat_id,
            photo: url,
            caption: Some(caption).filter(|c| !c.is_empty()),
        };
        self.call("sendPhoto", &request).await
    }
}
