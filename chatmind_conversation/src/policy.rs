//! Whether an inbound message deserves a generated reply.
//!
//! Messages that get no reply are still stored; the bot listens to all
//! group traffic for context.

use chatmind_core::{BotIdentity, ChatType, EntityKind, InboundEvent};

/// Why the bot decided to answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyReason {
    PrivateChat,
    Mentioned,
    ReplyToBot,
    /// The caller asked for an answer explicitly, e.g. `/ai <prompt>`.
    Directed,
}

/// First matching rule wins: private chat, then mention, then reply to one
/// of the bot's own messages.
#[must_use]
pub fn decide(event: &InboundEvent, me: &BotIdentity) -> Option<ReplyReason> {
    if event.chat_type == ChatType::Private {
        return Some(ReplyReason::PrivateChat);
    }

    let mention_entity = event.entities.iter().any(|e| e.kind == EntityKind::Mention);
    let named = me
        .username
        .as_deref()
        .filter(|name| !name.is_empty())
        .is_some_and(|name| event.text.contains(&format!("@{name}")));
    if mention_entity || named {
        return Some(ReplyReason::Mentioned);
    }

    let replied_to_me = event
        .reply_to_message
        .as_ref()
        .and_then(|r| r.from_user_id.as_deref())
        .is_some_and(|id| id == me.id);
    if replied_to_me {
        return Some(ReplyReason::ReplyToBot);
    }

    None
}

/// [`decide`], except that a directed turn always answers.
#[must_use]
pub fn decide_turn(event: &InboundEvent, me: &BotIdentity, directed: bool) -> Option<ReplyReason> {
    if directed {
        Some(ReplyReason::Directed)
    } else {
        decide(event, me)
    }
}

#[must_use]
pub fn should_respond(event: &InboundEvent, me: &BotIdentity) -> bool {
    decide(event, me).is_some()
}
