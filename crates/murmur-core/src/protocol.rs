//! Wire protocol: JSON text frames in both directions.
//!
//! Client → server carries one [`ChatPayload`]:
//!
//! ```json
//! { "text": "hi", "sender": "Alice" }
//! ```
//!
//! Server → client carries a [`ServerEvent`], tagged by `type`:
//!
//! ```json
//! { "type": "history", "messages": [ { "text": "...", "sender": "...", "timestamp": "..." } ] }
//! { "type": "message", "message": { "text": "...", "sender": "...", "timestamp": "..." } }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::PayloadError;
use crate::message::Message;

/// A validated client → server chat payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPayload {
    /// Message text as typed by the user.
    pub text: String,
    /// Sender display name.
    pub sender: String,
}

/// Lenient shape used to tell a missing field apart from a malformed one.
#[derive(Deserialize)]
struct RawPayload {
    text: Option<String>,
    sender: Option<String>,
}

impl ChatPayload {
    /// Create a payload (client side).
    pub fn new(text: impl Into<String>, sender: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: sender.into(),
        }
    }

    /// Parse and validate one inbound text frame.
    ///
    /// The frame must be a JSON object with string `text` and `sender`
    /// fields. `text` must not be blank after trimming and `sender` must not
    /// be empty. Unknown fields are ignored. Field values are kept untrimmed.
    pub fn parse(raw: &str) -> Result<Self, PayloadError> {
        let value: Value = serde_json::from_str(raw)?;
        if !value.is_object() {
            return Err(PayloadError::InvalidJson(serde::de::Error::custom(
                "expected a JSON object",
            )));
        }
        let payload: RawPayload = serde_json::from_value(value)?;
        let text = payload.text.ok_or(PayloadError::MissingField("text"))?;
        let sender = payload.sender.ok_or(PayloadError::MissingField("sender"))?;
        if text.trim().is_empty() {
            return Err(PayloadError::EmptyText);
        }
        if sender.is_empty() {
            return Err(PayloadError::EmptySender);
        }
        Ok(Self { text, sender })
    }

    /// Serialize for sending over the socket.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// A server → client envelope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerEvent {
    /// Full history replay, oldest-first, sent once right after a client joins.
    History {
        /// Buffered messages in receipt order.
        messages: Vec<Message>,
    },
    /// One newly accepted message.
    Message {
        /// The accepted message.
        message: Message,
    },
}

impl ServerEvent {
    /// Serialize for sending over the socket.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a frame received from the server (client side).
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// The `type` tag as it appears on the wire.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::History { .. } => "history",
            Self::Message { .. } => "message",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};

    fn msg(text: &str, sender: &str, second: u32) -> Message {
        Message::new(text, sender, Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, second).unwrap())
    }

    // ── ChatPayload::parse ──────────────────────────────────────────

    #[test]
    fn parse_valid_payload() {
        let p = ChatPayload::parse(r#"{"text":"hi","sender":"Alice"}"#).unwrap();
        assert_eq!(p, ChatPayload::new("hi", "Alice"));
    }

    #[test]
    fn parse_keeps_surrounding_whitespace() {
        let p = ChatPayload::parse(r#"{"text":"  hi  ","sender":"Alice"}"#).unwrap();
        assert_eq!(p.text, "  hi  ");
    }

    #[test]
    fn parse_ignores_unknown_fields() {
        let p = ChatPayload::parse(r#"{"text":"hi","sender":"A","timestamp":"x","id":7}"#).unwrap();
        assert_eq!(p.sender, "A");
    }

    #[test]
    fn parse_rejects_non_json() {
        assert_matches!(ChatPayload::parse("hello"), Err(PayloadError::InvalidJson(_)));
    }

    #[test]
    fn parse_rejects_non_object() {
        assert_matches!(
            ChatPayload::parse(r#"["hi","Alice"]"#),
            Err(PayloadError::InvalidJson(_))
        );
        assert_matches!(ChatPayload::parse("42"), Err(PayloadError::InvalidJson(_)));
    }

    #[test]
    fn parse_rejects_missing_text() {
        assert_matches!(
            ChatPayload::parse(r#"{"sender":"Alice"}"#),
            Err(PayloadError::MissingField("text"))
        );
    }

    #[test]
    fn parse_rejects_missing_sender() {
        assert_matches!(
            ChatPayload::parse(r#"{"text":"hi"}"#),
            Err(PayloadError::MissingField("sender"))
        );
    }

    #[test]
    fn parse_treats_null_as_missing() {
        assert_matches!(
            ChatPayload::parse(r#"{"text":null,"sender":"Alice"}"#),
            Err(PayloadError::MissingField("text"))
        );
    }

    #[test]
    fn parse_rejects_non_string_field() {
        assert_matches!(
            ChatPayload::parse(r#"{"text":5,"sender":"Alice"}"#),
            Err(PayloadError::InvalidJson(_))
        );
    }

    #[test]
    fn parse_rejects_whitespace_text() {
        assert_matches!(
            ChatPayload::parse(r#"{"text":"   ","sender":"Alice"}"#),
            Err(PayloadError::EmptyText)
        );
        assert_matches!(
            ChatPayload::parse(r#"{"text":"","sender":"Alice"}"#),
            Err(PayloadError::EmptyText)
        );
    }

    #[test]
    fn parse_rejects_empty_sender() {
        assert_matches!(
            ChatPayload::parse(r#"{"text":"hi","sender":""}"#),
            Err(PayloadError::EmptySender)
        );
    }

    #[test]
    fn parse_accepts_whitespace_sender_as_is() {
        let p = ChatPayload::parse(r#"{"text":"hi","sender":"   "}"#).unwrap();
        assert_eq!(p.sender, "   ");
    }

    #[test]
    fn payload_to_json_round_trips_through_parse() {
        let p = ChatPayload::new("hello there", "Bob");
        let parsed = ChatPayload::parse(&p.to_json().unwrap()).unwrap();
        assert_eq!(parsed, p);
    }

    // ── ServerEvent ─────────────────────────────────────────────────

    #[test]
    fn message_envelope_wire_shape() {
        let event = ServerEvent::Message {
            message: msg("hi", "A", 0),
        };
        insta::assert_json_snapshot!(event, @r#"
        {
          "type": "message",
          "message": {
            "text": "hi",
            "sender": "A",
            "timestamp": "2026-01-01T12:00:00.000000Z"
          }
        }
        "#);
    }

    #[test]
    fn history_envelope_wire_shape() {
        let event = ServerEvent::History {
            messages: vec![msg("hey", "Bob", 1), msg("yo", "Alice", 2)],
        };
        insta::assert_json_snapshot!(event, @r#"
        {
          "type": "history",
          "messages": [
            {
              "text": "hey",
              "sender": "Bob",
              "timestamp": "2026-01-01T12:00:01.000000Z"
            },
            {
              "text": "yo",
              "sender": "Alice",
              "timestamp": "2026-01-01T12:00:02.000000Z"
            }
          ]
        }
        "#);
    }

    #[test]
    fn empty_history_serializes_empty_array() {
        let json = ServerEvent::History { messages: vec![] }.to_json().unwrap();
        assert_eq!(json, r#"{"type":"history","messages":[]}"#);
    }

    #[test]
    fn event_type_matches_tag() {
        let history = ServerEvent::History { messages: vec![] };
        let message = ServerEvent::Message {
            message: msg("hi", "A", 0),
        };
        for event in [history, message] {
            let value: Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
            assert_eq!(value["type"], event.event_type());
        }
    }

    #[test]
    fn from_json_parses_server_frames() {
        let raw = r#"{"type":"message","message":{"text":"hi","sender":"A","timestamp":"2026-01-01T12:00:00.000000Z"}}"#;
        let event = ServerEvent::from_json(raw).unwrap();
        assert_eq!(
            event,
            ServerEvent::Message {
                message: msg("hi", "A", 0)
            }
        );
    }

    #[test]
    fn from_json_rejects_unknown_type() {
        assert!(ServerEvent::from_json(r#"{"type":"typing","sender":"A"}"#).is_err());
    }
}
