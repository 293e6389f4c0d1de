//! Message envelope and its JSON wire form.
//!
//! The wire form is a flat record so that producers in other processes can
//! push envelopes into a shared store without linking this crate:
//!
//! ```json
//! {"chatId":42,"messageId":0,"message":"hi","type":"text","imgUrl":"",
//!  "caption":"","callbackCount":0,"retryInterval":10,
//!  "nextTime":"2024-01-01T00:00:00Z"}
//! ```

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Wire value of the `type` field for text messages.
pub const KIND_TEXT: &str = "text";

/// Wire value of the `type` field for photo messages.
pub const KIND_PHOTO: &str = "photo";

/// What an envelope delivers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    /// Plain text message.
    Text { body: String },
    /// Photo referenced by URL, with an optional caption (empty when absent).
    Photo { url: String, caption: String },
    /// A kind this queue cannot deliver. Kept so the worker can drop it
    /// without retrying rather than treating it as corrupt data.
    Unsupported { kind: String },
}

impl MessageKind {
    /// Wire name of this kind.
    pub fn as_str(&self) -> &str {
        match self {
            MessageKind::Text { .. } => KIND_TEXT,
            MessageKind::Photo { .. } => KIND_PHOTO,
            MessageKind::Unsupported { kind } => kind,
        }
    }
}

/// One outbound message plus its retry bookkeeping.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// Destination chat.
    pub chat_id: i64,
    /// Message to reply to. Only positive ids are meaningful.
    pub reply_to: Option<i32>,
    /// Payload.
    pub kind: MessageKind,
    /// Number of failed attempts so far.
    pub attempt_count: u32,
    /// Base retry interval in seconds, recorded on the wire.
    pub retry_interval: u32,
    /// The envelope must not be dispatched before this instant.
    pub next_eligible_at: DateTime<Utc>,
    /// Exact bytes this envelope was decoded from, if any.
    raw: Option<Vec<u8>>,
}

impl PartialEq for Envelope {
    fn eq(&self, other: &Self) -> bool {
        // `raw` is a transport artifact and never part of equality.
        self.chat_id == other.chat_id
            && self.reply_to == other.reply_to
            && self.kind == other.kind
            && self.attempt_count == other.attempt_count
            && self.retry_interval == other.retry_interval
            && self.next_eligible_at == other.next_eligible_at
    }
}

impl Envelope {
    /// Create a fresh envelope, eligible immediately.
    pub fn new(
        chat_id: i64,
        reply_to: Option<i32>,
        kind: MessageKind,
        retry_interval: Duration,
    ) -> Self {
        Self {
            chat_id,
            reply_to: reply_to.filter(|id| *id > 0),
            kind,
            attempt_count: 0,
            retry_interval: u32::try_from(retry_interval.as_secs()).unwrap_or(u32::MAX),
            next_eligible_at: Utc::now(),
            raw: None,
        }
    }

    /// Create a text envelope.
    pub fn text(
        chat_id: i64,
        reply_to: Option<i32>,
        body: impl Into<String>,
        retry_interval: Duration,
    ) -> Self {
        Self::new(chat_id, reply_to, MessageKind::Text { body: body.into() }, retry_interval)
    }

    /// Create a photo envelope.
    pub fn photo(
        chat_id: i64,
        reply_to: Option<i32>,
        url: impl Into<String>,
        caption: impl Into<String>,
        retry_interval: Duration,
    ) -> Self {
        let kind = MessageKind::Photo {
            url: url.into(),
            caption: caption.into(),
        };
        Self::new(chat_id, reply_to, kind, retry_interval)
    }

    /// Decode an envelope from store bytes, retaining the bytes verbatim.
    pub fn decode(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let wire: WireMessage = serde_json::from_slice(bytes)?;
        let mut envelope = Envelope::from(wire);
        envelope.raw = Some(bytes.to_vec());
        Ok(envelope)
    }

    /// Encode the envelope into its wire form.
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&WireMessage::from(self))
    }

    /// The bytes this envelope was decoded from.
    pub fn raw(&self) -> Option<&[u8]> {
        self.raw.as_deref()
    }

    /// Whether the envelope may be dispatched at `now`.
    pub fn is_ready(&self, now: DateTime<Utc>) -> bool {
        now >= self.next_eligible_at
    }

    /// Record a failed attempt and push eligibility `delay` past `now`.
    ///
    /// Drops the raw form, which no longer matches the envelope.
    pub fn schedule_retry(&mut self, delay: Duration, now: DateTime<Utc>) {
        let delay = TimeDelta::from_std(delay).unwrap_or(TimeDelta::MAX);
        self.attempt_count = self.attempt_count.saturating_add(1);
        self.next_eligible_at = now.checked_add_signed(delay).unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.raw = None;
    }
}

/// Flat JSON record shared with producers in other processes.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMessage {
    chat_id: i64,
    #[serde(default)]
    message_id: i32,
    #[serde(default)]
    message: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    img_url: String,
    #[serde(default)]
    caption: String,
    #[serde(rename = "callbackCount", default)]
    attempt_count: u32,
    #[serde(default)]
    retry_interval: u32,
    #[serde(default)]
    next_time: DateTime<Utc>,
}

impl From<WireMessage> for Envelope {
    fn from(wire: WireMessage) -> Self {
        let kind = match wire.kind.as_str() {
            KIND_TEXT => MessageKind::Text { body: wire.message },
            KIND_PHOTO => MessageKind::Photo {
                url: wire.img_url,
                caption: wire.caption,
            },
            _ => MessageKind::Unsupported { kind: wire.kind },
        };

        Envelope {
            chat_id: wire.chat_id,
            reply_to: Some(wire.message_id).filter(|id| *id > 0),
            kind,
            attempt_count: wire.attempt_count,
            retry_interval: wire.retry_interval,
            next_eligible_at: wire.next_time,
            raw: None,
        }
    }
}

impl From<&Envelope> for WireMessage {
    fn from(envelope: &Envelope) -> Self {
        let (message, img_url, caption) = match &envelope.kind {
            MessageKind::Text { body } => (body.clone(), String::new(), String::new()),
            MessageKind::Photo { url, caption } => (String::new(), url.clone(), caption.clone()),
            MessageKind::Unsupported { .. } => (String::new(), String::new(), String::new()),
        };

        WireMessage {
            chat_id: envelope.chat_id,
            message_id: envelope.reply_to.unwrap_or(0),
            message,
            kind: envelope.kind.as_str().to_string(),
            img_url,
            caption,
            attempt_count: envelope.attempt_count,
            retry_interval: envelope.retry_interval,
            next_time: envelope.next_eligible_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_envelope_is_ready_now() {
        let envelope = Envelope::text(1, None, "hello", Duration::from_secs(10));
        assert_eq!(envelope.attempt_count, 0);
        assert_eq!(envelope.retry_interval, 10);
        assert!(envelope.is_ready(Utc::now()));
        assert!(envelope.raw().is_none());
    }

    #[test]
    fn test_round_trip_preserves_fields() {
        let mut envelope = Envelope::photo(
            -100123,
            Some(77),
            "https://example.com/cat.png",
            "a cat",
            Duration::from_secs(10),
        );
        envelope.schedule_retry(Duration::from_secs(40), Utc::now());

        let bytes = envelope.encode().unwrap();
        let decoded = Envelope::decode(&bytes).unwrap();

        assert_eq!(decoded, envelope);
        assert_eq!(decoded.raw(), Some(bytes.as_slice()));
    }

    #[test]
    fn test_round_trip_text_with_reply() {
        let envelope = Envelope::text(9, Some(3), "pong", Duration::from_secs(10));
        let decoded = Envelope::decode(&envelope.encode().unwrap()).unwrap();
        assert_eq!(decoded.reply_to, Some(3));
        assert_eq!(decoded.kind, MessageKind::Text { body: "pong".into() });
    }

    #[test]
    fn test_non_positive_reply_is_dropped() {
        let envelope = Envelope::text(9, Some(0), "x", Duration::from_secs(10));
        assert_eq!(envelope.reply_to, None);
    }

    #[test]
    fn test_decode_wire_form_from_foreign_producer() {
        let raw = br#"{"chatId":42,"messageId":5,"message":"hi","type":"text","imgUrl":"",
"caption":"","callbackCount":2,"retryInterval":10,"nextTime":"2024-01-01T00:00:00Z"}"#;
        let envelope = Envelope::decode(raw).unwrap();

        assert_eq!(envelope.chat_id, 42);
        assert_eq!(envelope.reply_to, Some(5));
        assert_eq!(envelope.attempt_count, 2);
        assert_eq!(envelope.retry_interval, 10);
        assert_eq!(envelope.kind, MessageKind::Text { body: "hi".into() });
        assert_eq!(envelope.raw(), Some(&raw[..]));
    }

    #[test]
    fn test_unknown_kind_decodes_as_unsupported() {
        let raw = br#"{"chatId":1,"type":"sticker","nextTime":"2024-01-01T00:00:00Z"}"#;
        let envelope = Envelope::decode(raw).unwrap();
        assert_eq!(
            envelope.kind,
            MessageKind::Unsupported { kind: "sticker".into() }
        );
        assert_eq!(envelope.kind.as_str(), "sticker");
    }

    #[test]
    fn test_malformed_bytes_fail_to_decode() {
        assert!(Envelope::decode(b"not json").is_err());
        assert!(Envelope::decode(br#"{"type":"text"}"#).is_err());
    }

    #[test]
    fn test_schedule_retry_updates_bookkeeping() {
        let raw = Envelope::text(1, None, "x", Duration::from_secs(10)).encode().unwrap();
        let mut envelope = Envelope::decode(&raw).unwrap();
        let now = Utc::now();

        envelope.schedule_retry(Duration::from_secs(40), now);

        assert_eq!(envelope.attempt_count, 1);
        assert_eq!(envelope.next_eligible_at, now + TimeDelta::seconds(40));
        assert!(!envelope.is_ready(now));
        assert!(envelope.raw().is_none());
    }
}
