//! Transport-neutral inbound events.
//!
//! The Telegram adapter (or the local CLI) normalizes whatever it receives
//! into an [`InboundEvent`]; everything downstream only sees this shape.

use serde::{Deserialize, Serialize};

use crate::ValidationError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatType {
    Private,
    Group,
    Supergroup,
}

impl std::fmt::Display for ChatType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Private => write!(f, "private"),
            Self::Group => write!(f, "group"),
            Self::Supergroup => write!(f, "supergroup"),
        }
    }
}

impl std::str::FromStr for ChatType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(Self::Private),
            "group" => Ok(Self::Group),
            "supergroup" => Ok(Self::Supergroup),
            other => Err(ValidationError::UnsupportedChatType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Mention,
    TextMention,
    BotCommand,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageEntity {
    pub kind: EntityKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Sender {
    pub id: String,
    pub username: Option<String>,
}

/// The message an inbound event replies to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReplyRef {
    pub from_user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InboundEvent {
    pub chat_id: String,
    pub chat_type: ChatType,
    pub from_user: Option<Sender>,
    pub text: String,
    #[serde(default)]
    pub entities: Vec<MessageEntity>,
    #[serde(default)]
    pub reply_to_message: Option<ReplyRef>,
}

impl InboundEvent {
    /// Plain text event with no entities and no reply reference.
    #[must_use]
    pub fn text(
        chat_id: impl Into<String>,
        chat_type: ChatType,
        from_user: Option<Sender>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            chat_id: chat_id.into(),
            chat_type,
            from_user,
            text: text.into(),
            entities: Vec::new(),
            reply_to_message: None,
        }
    }

    /// Trim the text and reject events that cannot become a stored message.
    pub fn validate(mut self) -> Result<Self, ValidationError> {
        if self.chat_id.trim().is_empty() {
            return Err(ValidationError::MissingChatId);
        }
        let trimmed = self.text.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyText);
        }
        if trimmed.len() != self.text.len() {
            self.text = trimmed.to_string();
        }
        Ok(self)
    }

    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.from_user.as_ref().map(|u| u.id.as_str())
    }

    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.from_user.as_ref().and_then(|u| u.username.as_deref())
    }
}

/// Who the bot itself is, as reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotIdentity {
    pub id: String,
    pub username: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_trims_text() {
        let event = InboundEvent::text("42", ChatType::Group, None, "  hello \n")
            .validate()
            .unwrap();
        assert_eq!(event.text, "hello");
    }

    #[test]
    fn validate_rejects_blank_text_and_chat() {
        assert_eq!(
            InboundEvent::text("42", ChatType::Private, None, "   ").validate(),
            Err(ValidationError::EmptyText)
        );
        assert_eq!(
            InboundEvent::text("", ChatType::Private, None, "hi").validate(),
            Err(ValidationError::MissingChatId)
        );
    }

    #[test]
    fn chat_type_parsing() {
        assert_eq!("supergroup".parse::<ChatType>(), Ok(ChatType::Supergroup));
        assert!(matches!(
            "channel".parse::<ChatType>(),
            Err(ValidationError::UnsupportedChatType(_))
        ));
    }

    #[test]
    fn sender_accessors() {
        let event = InboundEvent::text(
            "1",
            ChatType::Private,
            Some(Sender {
                id: "7".into(),
                username: None,
            }),
            "hi",
        );
        assert_eq!(event.user_id(), Some("7"));
        assert_eq!(event.username(), None);
    }
}
