//! Messages in a conversation's ordered log.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;
use crate::domain::turn::TurnStage;

/// Role of the message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System-originated text (greetings, apologies).
    System,
    /// End-user input.
    User,
    /// Assistant (handler) response.
    Assistant,
}

/// One entry in a conversation's ordered message log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    /// Who sent this message.
    pub role: MessageRole,
    /// Message content.
    pub content: String,
    /// When the message was appended.
    pub timestamp: Timestamp,
    /// Pipeline stage that produced the message, when applicable.
    pub stage: Option<TurnStage>,
    /// Confidence reported for this message, when applicable.
    pub confidence: Option<f64>,
    /// Handler that produced the message, when applicable.
    pub handler: Option<String>,
}

impl ConversationMessage {
    /// Creates a message with no stage metadata.
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Timestamp::now(),
            stage: None,
            confidence: None,
            handler: None,
        }
    }

    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Creates a system message tagged with the stage that produced it.
    pub fn system(content: impl Into<String>, stage: TurnStage) -> Self {
        Self {
            stage: Some(stage),
            ..Self::new(MessageRole::System, content)
        }
    }

    /// Creates an assistant message with handler attribution.
    pub fn assistant(
        content: impl Into<String>,
        handler: impl Into<String>,
        confidence: f64,
    ) -> Self {
        Self {
            stage: Some(TurnStage::Processing),
            confidence: Some(confidence),
            handler: Some(handler.into()),
            ..Self::new(MessageRole::Assistant, content)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_carries_no_stage_metadata() {
        let msg = ConversationMessage::user("hello");
        assert_eq!(msg.role, MessageRole::User);
        assert!(msg.stage.is_none());
        assert!(msg.handler.is_none());
    }

    #[test]
    fn assistant_message_records_handler_and_confidence() {
        let msg = ConversationMessage::assistant("hi", "dining_handler", 0.9);
        assert_eq!(msg.role, MessageRole::Assistant);
        assert_eq!(msg.stage, Some(TurnStage::Processing));
        assert_eq!(msg.handler.as_deref(), Some("dining_handler"));
        assert_eq!(msg.confidence, Some(0.9));
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&MessageRole::User).unwrap(), "\"user\"");
        assert_eq!(
            serde_json::to_string(&MessageRole::Assistant).unwrap(),
            "\"assistant\""
        );
    }
}
