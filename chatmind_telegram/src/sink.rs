use async_trait::async_trait;
use chatmind_conversation::ReplySink;
use teloxide::prelude::*;
use teloxide::types::ChatAction;
use tracing::debug;

use crate::Error;

/// Sends replies through the Bot API.
#[derive(Clone)]
pub struct TelegramSink {
    bot: Bot,
}

impl TelegramSink {
    #[must_use]
    pub const fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn parse_chat_id(chat_id: &str) -> Result<ChatId, Error> {
    chat_id
        .parse::<i64>()
        .map(ChatId)
        .map_err(|_| Error::ChatId(chat_id.to_string()))
}

#[async_trait]
impl ReplySink for TelegramSink {
    async fn emit(&self, chat_id: &str, text: &str) -> anyhow::Result<()> {
        let chat = parse_chat_id(chat_id)?;
        self.bot.send_message(chat, text).await?;
        Ok(())
    }

    async fn typing(&self, chat_id: &str) {
        let Ok(chat) = parse_chat_id(chat_id) else {
            return;
        };
        if let Err(e) = self.bot.send_chat_action(chat, ChatAction::Typing).await {
            debug!("Typing indicator failed for chat {chat_id}: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_ids_parse_as_signed() {
        assert_eq!(parse_chat_id("-1001234").unwrap(), ChatId(-1_001_234));
        assert_eq!(parse_chat_id("42").unwrap(), ChatId(42));
        assert!(matches!(parse_chat_id("abc"), Err(Error::ChatId(_))));
    }
}
