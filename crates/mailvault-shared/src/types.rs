use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::InvalidStatus;

/// Lifecycle state of a contact message. There is no deleted state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    New,
    Read,
    Replied,
    Closed,
}

impl MessageStatus {
    pub const ALL: [MessageStatus; 4] = [
        MessageStatus::New,
        MessageStatus::Read,
        MessageStatus::Replied,
        MessageStatus::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::New => "new",
            MessageStatus::Read => "read",
            MessageStatus::Replied => "replied",
            MessageStatus::Closed => "closed",
        }
    }
}

impl std::fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageStatus {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(MessageStatus::New),
            "read" => Ok(MessageStatus::Read),
            "replied" => Ok(MessageStatus::Replied),
            "closed" => Ok(MessageStatus::Closed),
            other => Err(InvalidStatus(other.to_string())),
        }
    }
}

/// A contact-form submission in plaintext. Only ever held in memory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Caller-generated unique identifier.
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    /// Free-text body.
    pub message: String,
    pub ip: String,
    pub user_agent: String,
    /// Creation time; also determines the record's file path.
    pub timestamp: DateTime<Utc>,
    pub status: MessageStatus,
}

impl Message {
    /// Short single-line excerpt of the body, at most `max` characters.
    pub fn subject(&self, max: usize) -> String {
        let line = self.message.lines().next().unwrap_or_default();
        if line.chars().count() <= max {
            return line.to_string();
        }
        let keep = max.saturating_sub(3);
        let mut subject: String = line.chars().take(keep).collect();
        subject.push_str("...");
        subject
    }
}

/// The on-disk envelope of one encrypted message.
///
/// `id` stays in plaintext so records can be located without the key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EncryptedMessage {
    pub id: String,
    /// Standard base64 of the AEAD output (ciphertext || tag).
    pub ciphertext: String,
    /// Standard base64 of the per-record nonce.
    pub nonce: String,
    /// RFC 3339, whole seconds, `Z` suffix.
    pub created_at: String,
    pub version: String,
}

/// Render a timestamp the way `created_at` stores it.
pub fn format_created_at(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Message {
        Message {
            id: "msg-1".to_string(),
            name: "Jane Doe".to_string(),
            email: "jane@example.com".to_string(),
            company: None,
            message: "Hello there".to_string(),
            ip: "10.0.0.1".to_string(),
            user_agent: "Test/1.0".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap(),
            status: MessageStatus::New,
        }
    }

    #[test]
    fn test_status_parse_and_display() {
        for status in MessageStatus::ALL {
            assert_eq!(status.as_str().parse::<MessageStatus>().unwrap(), status);
            assert_eq!(status.to_string(), status.as_str());
        }
        let err = "archived".parse::<MessageStatus>().unwrap_err();
        assert_eq!(err, InvalidStatus("archived".to_string()));
        assert!("NEW".parse::<MessageStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&MessageStatus::Replied).unwrap();
        assert_eq!(json, "\"replied\"");
    }

    #[test]
    fn test_company_omitted_when_absent() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!(json.get("company").is_none());
        assert_eq!(json["user_agent"], "Test/1.0");
        assert_eq!(json["status"], "new");

        let mut with_company = sample();
        with_company.company = Some("Acme".to_string());
        let json = serde_json::to_value(with_company).unwrap();
        assert_eq!(json["company"], "Acme");
    }

    #[test]
    fn test_missing_company_deserializes() {
        let raw = r#"{"id":"a","name":"n","email":"e","message":"m","ip":"i",
            "user_agent":"u","timestamp":"2024-03-05T14:07:09Z","status":"read"}"#;
        let msg: Message = serde_json::from_str(raw).unwrap();
        assert_eq!(msg.company, None);
        assert_eq!(msg.status, MessageStatus::Read);
    }

    #[test]
    fn test_created_at_format() {
        assert_eq!(format_created_at(&sample().timestamp), "2024-03-05T14:07:09Z");
    }

    #[test]
    fn test_subject_truncates() {
        let mut msg = sample();
        msg.message = "x".repeat(60);
        let subject = msg.subject(50);
        assert_eq!(subject.chars().count(), 50);
        assert!(subject.ends_with("..."));

        msg.message = "short\nsecond line".to_string();
        assert_eq!(msg.subject(50), "short");
    }
}
