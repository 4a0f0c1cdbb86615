//! Chat messages and the transcript handed to the completion backend.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Who wrote a message.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person chatting with the clinic assistant.
    User,

    /// The assistant.
    Model,
}

impl Role {
    /// The label used for this role in transcripts.
    pub fn label(self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Model => "Assistant",
        }
    }
}

/// One entry of a conversation. Messages are never edited once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who wrote the message.
    pub role: Role,

    /// The raw text, before any markup formatting.
    pub text: String,

    /// When the message was created.
    #[serde(with = "crate::utils::time::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl Message {
    /// Creates a message stamped with the given time.
    pub fn new(role: Role, text: impl Into<String>, timestamp: OffsetDateTime) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp,
        }
    }

    /// Creates a user message stamped now.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text, crate::utils::time::now())
    }

    /// Creates a model message stamped now.
    pub fn model(text: impl Into<String>) -> Self {
        Self::new(Role::Model, text, crate::utils::time::now())
    }

    /// Renders the message as a `"<RoleLabel>: <text>"` transcript line.
    pub fn transcript_line(&self) -> String {
        format!("{}: {}", self.role.label(), self.text)
    }
}

/// Serializes `messages` into transcript lines, oldest first.
pub fn transcript(messages: &[Message]) -> Vec<String> {
    messages.iter().map(Message::transcript_line).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn transcript_uses_role_labels() {
        let at = datetime!(2026-03-01 09:00 UTC);
        let messages = vec![
            Message::new(Role::Model, "您好！\n**門診時間**", at),
            Message::new(Role::User, "門診時間", at),
        ];
        assert_eq!(
            transcript(&messages),
            vec![
                "Assistant: 您好！\n**門診時間**".to_string(),
                "User: 門診時間".to_string(),
            ]
        );
    }

    #[test]
    fn message_serializes_role_lowercase() {
        let message = Message::new(Role::Model, "hi", datetime!(2026-03-01 09:00 UTC));
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "role": "model",
                "text": "hi",
                "timestamp": "2026-03-01T09:00:00Z",
            })
        );
    }
}
