//! Rejection reasons for inbound chat payloads.

use thiserror::Error;

/// Why an inbound frame was not accepted as a chat message.
///
/// None of these are fatal: the relay logs the rejection and keeps the
/// connection open. No error frame is sent back to the client.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// The frame was not valid JSON, or not a JSON object.
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    /// A required field was absent or null.
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    /// `text` was empty or whitespace-only.
    #[error("message text is empty")]
    EmptyText,
    /// `sender` was the empty string.
    #[error("sender name is empty")]
    EmptySender,
}

impl PayloadError {
    /// Short stable label for metrics and structured logs.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::InvalidJson(_) => "invalid_json",
            Self::MissingField(_) => "missing_field",
            Self::EmptyText => "empty_text",
            Self::EmptySender => "empty_sender",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_json_display() {
        let json_err = serde_json::from_str::<serde_json::Value>("{bad").unwrap_err();
        let err = PayloadError::from(json_err);
        assert!(err.to_string().starts_with("invalid JSON payload"));
    }

    #[test]
    fn missing_field_display() {
        let err = PayloadError::MissingField("sender");
        assert_eq!(err.to_string(), "missing required field `sender`");
    }

    #[test]
    fn reasons_are_snake_case() {
        let json_err = serde_json::from_str::<serde_json::Value>("x").unwrap_err();
        let errors = [
            PayloadError::InvalidJson(json_err),
            PayloadError::MissingField("text"),
            PayloadError::EmptyText,
            PayloadError::EmptySender,
        ];
        for err in &errors {
            assert!(
                err.reason().chars().all(|c| c.is_ascii_lowercase() || c == '_'),
                "reason '{}' must be snake_case",
                err.reason()
            );
        }
    }
}
