//! The chat message record.
//!
//! A [`Message`] is created by the relay at the instant an inbound payload is
//! accepted and is never mutated afterwards. The `timestamp` is assigned by
//! the server, never taken from the client.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Sub-second digits kept on server timestamps (microseconds).
const TIMESTAMP_PRECISION: u16 = 6;

/// An accepted chat message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    text: String,
    sender: String,
    #[serde(with = "timestamp")]
    timestamp: DateTime<Utc>,
}

impl Message {
    /// Build a message from validated parts.
    ///
    /// The timestamp is truncated to microseconds so the in-memory value
    /// matches what goes over the wire.
    pub fn new(text: impl Into<String>, sender: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            text: text.into(),
            sender: sender.into(),
            timestamp: timestamp.trunc_subsecs(TIMESTAMP_PRECISION),
        }
    }

    /// Display text, exactly as the client sent it.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Sender display name.
    pub fn sender(&self) -> &str {
        &self.sender
    }

    /// Server-assigned receipt time.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Current UTC time at wire precision.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(TIMESTAMP_PRECISION)
}

/// Format a timestamp the way it appears on the wire.
///
/// RFC 3339 in UTC with a fixed six-digit fraction and a `Z` suffix, so
/// lexicographic order equals chronological order.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Serde adapter for wire-format timestamps.
pub mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize as fixed-precision RFC 3339.
    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timestamp(ts))
    }

    /// Parse any RFC 3339 timestamp and normalize it to UTC.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
