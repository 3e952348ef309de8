//! Conversion of Telegram updates into [`InboundEvent`]s.

use chatmind_core::{
    ChatType, EntityKind, InboundEvent, MessageEntity, ReplyRef, Sender, ValidationError,
};
use teloxide::types::{Chat, Message, MessageEntityKind, User};

pub fn chat_type(chat: &Chat) -> Result<ChatType, ValidationError> {
    if chat.is_private() {
        Ok(ChatType::Private)
    } else if chat.is_supergroup() {
        Ok(ChatType::Supergroup)
    } else if chat.is_group() {
        Ok(ChatType::Group)
    } else {
        Err(ValidationError::UnsupportedChatType("channel".to_string()))
    }
}

#[must_use]
pub const fn entity_kind(kind: &MessageEntityKind) -> EntityKind {
    match kind {
        MessageEntityKind::Mention => EntityKind::Mention,
        MessageEntityKind::TextMention { .. } => EntityKind::TextMention,
        MessageEntityKind::BotCommand => EntityKind::BotCommand,
        _ => EntityKind::Other,
    }
}

#[must_use]
pub fn sender(user: &User) -> Sender {
    Sender {
        id: user.id.0.to_string(),
        username: user.username.clone(),
    }
}

/// Normalize a text message. `text` replaces the message text when given,
/// which is how `/ai` hands over just its prompt.
pub fn to_event(msg: &Message, text: Option<&str>) -> Result<InboundEvent, ValidationError> {
    let text = text
        .or_else(|| msg.text())
        .ok_or(ValidationError::EmptyText)?;

    let entities = msg
        .entities()
        .unwrap_or_default()
        .iter()
        .map(|e| MessageEntity {
            kind: entity_kind(&e.kind),
        })
        .collect();

    let reply_to_message = msg.reply_to_message().map(|reply| ReplyRef {
        from_user_id: reply.from.as_ref().map(|u| u.id.0.to_string()),
    });

    InboundEvent {
        chat_id: msg.chat.id.0.to_string(),
        chat_type: chat_type(&msg.chat)?,
        from_user: msg.from.as_ref().map(sender),
        text: text.to_string(),
        entities,
        reply_to_message,
    }
    .validate()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_entity_kinds() {
        assert_eq!(entity_kind(&MessageEntityKind::Mention), EntityKind::Mention);
        assert_eq!(
            entity_kind(&MessageEntityKind::BotCommand),
            EntityKind::BotCommand
        );
        assert_eq!(entity_kind(&MessageEntityKind::Bold), EntityKind::Other);
        assert_eq!(entity_kind(&MessageEntityKind::Url), EntityKind::Other);
    }
}
