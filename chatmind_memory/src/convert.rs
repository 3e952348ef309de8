use chatmind_core::{MessageRole, StoredMessage};
use chatmind_entities::messages;
use tracing::warn;

pub fn stored_message_from_model(m: messages::Model) -> StoredMessage {
    let role = m.role.parse::<MessageRole>().unwrap_or_else(|e| {
        warn!("Message {} has {e}, treating it as a user turn", m.id);
        MessageRole::User
    });

    StoredMessage {
        id: m.id,
        chat_id: m.chat_id,
        user_id: m.user_id,
        username: m.username,
        role,
        content: m.content,
        ts: m.ts,
    }
}
