//! Bot API request and response records.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub(crate) struct ReplyParameters {
    pub message_id: i32,
}

#[derive(Debug, Serialize)]
pub(crate) struct SendMessageRequest<'a> {
    pub chat_id: i64,
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_parameters: Option<ReplyParameters>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SendPhotoRequest<'a> {
    pub chat_id: i64,
    pub photo: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<&'a str>,
}

/// Envelope of every Bot API response. `result` is not needed.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiResponse {
    pub ok: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub error_code: Option<i64>,
}
