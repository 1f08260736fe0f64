//! WhatsApp engine webhook envelope (spec §4.L, §6)
//!
//! The engine event envelope is `{id, event, session, timestamp,
//! payload}`. `timestamp` is tolerant: integer, float (truncated), or
//! null (defaults to 0); a JSON string is rejected.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// The fixed event vocabulary the intake dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookEvent {
    Message,
    MessageEdited,
    MessageReaction,
    MessageAck,
    MessageWaiting,
    Unknown,
}

impl From<&str> for WebhookEvent {
    fn from(value: &str) -> Self {
        match value {
            "message" => Self::Message,
            "message.edited" => Self::MessageEdited,
            "message.reaction" => Self::MessageReaction,
            "message.ack" => Self::MessageAck,
            "message.waiting" => Self::MessageWaiting,
            _ => Self::Unknown,
        }
    }
}

fn deserialize_tolerant_timestamp<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Number(n) => Ok(n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)).unwrap_or(0)),
        Value::Null => Ok(0),
        other => Err(serde::de::Error::custom(format!("timestamp must be numeric or null, got {other}"))),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEnvelope {
    pub id: String,
    #[serde(deserialize_with = "deserialize_tolerant_timestamp")]
    pub timestamp: i64,
    pub event: String,
    pub session: String,
    #[serde(default)]
    pub me: Option<String>,
    pub payload: WebhookPayload,
}

impl WebhookEnvelope {
    #[must_use]
    pub fn event_kind(&self) -> WebhookEvent {
        WebhookEvent::from(self.event.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    pub id: String,
    #[serde(default, deserialize_with = "deserialize_tolerant_timestamp")]
    pub timestamp: i64,
    #[serde(default)]
    pub from: String,
    #[serde(default, rename = "fromMe")]
    pub from_me: bool,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default, rename = "hasMedia")]
    pub has_media: bool,
    #[serde(default)]
    pub participant: Option<String>,
    #[serde(default, rename = "notifyName")]
    pub notify_name: Option<String>,
    #[serde(default)]
    pub media: Option<MediaPayload>,
    #[serde(default)]
    pub reaction: Option<ReactionPayload>,
    #[serde(default, rename = "editedMessageId")]
    pub edited_message_id: Option<String>,
    #[serde(default)]
    pub ack: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaPayload {
    pub url: String,
    #[serde(default, rename = "mimetype")]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReactionPayload {
    pub text: String,
    #[serde(rename = "msgId")]
    pub msg_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_integer_timestamp() {
        let json = r#"{"id":"1","timestamp":1700000000,"event":"message","session":"personal",
            "payload":{"id":"wa-1","from":"1234567890@c.us","body":"hi"}}"#;
        let envelope: WebhookEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.timestamp, 1_700_000_000);
        assert_eq!(envelope.event_kind(), WebhookEvent::Message);
    }

    #[test]
    fn truncates_float_timestamp() {
        let json = r#"{"id":"1","timestamp":1700000000.9,"event":"message","session":"personal",
            "payload":{"id":"wa-1","from":"1234567890@c.us"}}"#;
        let envelope: WebhookEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.timestamp, 1_700_000_000);
    }

    #[test]
    fn null_timestamp_defaults_to_zero() {
        let json = r#"{"id":"1","timestamp":null,"event":"message","session":"personal",
            "payload":{"id":"wa-1","from":"1234567890@c.us"}}"#;
        let envelope: WebhookEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.timestamp, 0);
    }

    #[test]
    fn string_timestamp_is_rejected() {
        let json = r#"{"id":"1","timestamp":"1700000000","event":"message","session":"personal",
            "payload":{"id":"wa-1","from":"1234567890@c.us"}}"#;
        let result: Result<WebhookEnvelope, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn recognizes_ack_event() {
        let json = r#"{"id":"1","timestamp":1,"event":"message.ack","session":"personal",
            "payload":{"id":"wa-1","from":"1234567890@c.us","ack":2}}"#;
        let envelope: WebhookEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.event_kind(), WebhookEvent::MessageAck);
        assert_eq!(envelope.payload.ack, Some(2));
    }

    #[test]
    fn unknown_event_falls_through() {
        assert_eq!(WebhookEvent::from("state.change"), WebhookEvent::Unknown);
    }
}
