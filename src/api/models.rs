use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One completed exchange: the text the user sent and the reply (or replies) it got.
///
/// Field names match the stored JSON layout (`sentMessage`, `responses`, ...).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub sent_message: String,
    pub responses: Vec<String>,
    pub sent_timestamp: DateTime<Utc>,
    pub response_timestamps: Vec<DateTime<Utc>>,
}

impl Conversation {
    /// Sent and reply timestamps are both `at`; the exchange is recorded once the reply is in.
    pub fn new(sent_message: impl Into<String>, response: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            sent_message: sent_message.into(),
            responses: vec![response.into()],
            sent_timestamp: at,
            response_timestamps: vec![at],
        }
    }

    pub fn push_response(&mut self, response: impl Into<String>, at: DateTime<Utc>) {
        self.responses.push(response.into());
        self.response_timestamps.push(at);
    }

    pub fn is_consistent(&self) -> bool {
        self.responses.len() == self.response_timestamps.len()
    }

    /// Replies paired with the instant each one arrived.
    pub fn replies(&self) -> impl Iterator<Item = (&str, &DateTime<Utc>)> {
        self.responses.iter().map(String::as_str).zip(self.response_timestamps.iter())
    }
}

/// Body of `POST /message/`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OutgoingMessage {
    pub phone_number: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn serializes_with_stored_field_names() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let conv = Conversation::new("Hello", "Hi there", at);
        let json = serde_json::to_value(&conv).unwrap();
        assert_eq!(json["sentMessage"], "Hello");
        assert_eq!(json["responses"][0], "Hi there");
        assert_eq!(json["sentTimestamp"], "2024-03-01T12:00:00Z");
        assert_eq!(json["responseTimestamps"][0], "2024-03-01T12:00:00Z");
    }

    #[test]
    fn reads_browser_style_timestamps() {
        let raw = r#"{"sentMessage":"a","responses":["b"],"sentTimestamp":"2024-03-01T12:00:00.123Z","responseTimestamps":["2024-03-01T12:00:00.123Z"]}"#;
        let conv: Conversation = serde_json::from_str(raw).unwrap();
        assert_eq!(conv.sent_message, "a");
        assert!(conv.is_consistent());
    }

    #[test]
    fn replies_stay_paired_with_timestamps() {
        let first = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let second = Utc.with_ymd_and_hms(2024, 3, 1, 12, 5, 0).unwrap();
        let mut conv = Conversation::new("q", "one", first);
        conv.push_response("two", second);
        let pairs: Vec<_> = conv.replies().collect();
        assert_eq!(pairs, vec![("one", &first), ("two", &second)]);

        conv.response_timestamps.pop();
        assert!(!conv.is_consistent());
    }

    #[test]
    fn outgoing_body_uses_snake_case() {
        let body = OutgoingMessage { phone_number: "555-1234".into(), message: "Hello".into() };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({ "phone_number": "555-1234", "message": "Hello" })
        );
    }
}
