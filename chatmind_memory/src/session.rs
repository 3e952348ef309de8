use async_trait::async_trait;
use chatmind_core::{ConversationStore, MessageRole, RecentWindow, StorageError, StoredMessage};

use crate::manager::ChatMemory;

fn now_ts() -> i64 {
    chrono::Utc::now().timestamp()
}

#[async_trait]
impl ConversationStore for ChatMemory {
    async fn append_message(
        &self,
        chat_id: &str,
        user_id: Option<&str>,
        username: Option<&str>,
        role: MessageRole,
        content: &str,
    ) -> Result<i64, StorageError> {
        self.append_message_at(chat_id, user_id, username, role, content, now_ts())
            .await
    }

    async fn recent_messages(
        &self,
        chat_id: &str,
        window: RecentWindow,
    ) -> Result<Vec<StoredMessage>, StorageError> {
        let rows = self.fetch_window(chat_id, window.row_limit).await?;
        Ok(window.apply(rows))
    }

    async fn latest_summary(&self, chat_id: &str) -> Result<Option<String>, StorageError> {
        Ok(self.latest_summary_row(chat_id).await?.map(|s| s.content))
    }

    async fn append_summary(&self, chat_id: &str, content: &str) -> Result<i64, StorageError> {
        self.insert_summary(chat_id, content, now_ts()).await
    }

    async fn message_count(&self, chat_id: &str) -> Result<u64, StorageError> {
        self.count_messages(chat_id).await
    }

    async fn wipe(&self, chat_id: &str) -> Result<(), StorageError> {
        self.delete_chat(chat_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory() -> ChatMemory {
        ChatMemory::in_memory().await.expect("in-memory sqlite")
    }

    #[tokio::test]
    async fn append_is_visible_to_following_reads() {
        let memory = memory().await;
        let id = memory
            .append_message("chat-1", Some("7"), Some("alice"), MessageRole::User, "Hello")
            .await
            .unwrap();

        let rows = memory
            .recent_messages("chat-1", RecentWindow::new(300, 6000))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, id);
        assert_eq!(rows[0].username.as_deref(), Some("alice"));
        assert_eq!(memory.message_count("chat-1").await.unwrap(), 1);
        assert_eq!(memory.message_count("chat-2").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn empty_content_is_rejected() {
        let memory = memory().await;
        let err = memory
            .append_message("chat-1", None, None, MessageRole::User, "")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::EmptyContent));
        assert_eq!(memory.message_count("chat-1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn rows_come_back_in_ts_then_id_order() {
        let memory = memory().await;
        // Inserted out of time order; two rows share a second.
        for (ts, text) in [(300, "c"), (100, "a"), (200, "b1"), (200, "b2"), (400, "d")] {
            memory
                .append_message_at("chat", None, None, MessageRole::User, text, ts)
                .await
                .unwrap();
        }

        let rows = memory
            .recent_messages("chat", RecentWindow::new(300, 100_000))
            .await
            .unwrap();
        let contents: Vec<&str> = rows.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["a", "b1", "b2", "c", "d"]);
        assert!(rows.windows(2).all(|w| (w[0].ts, w[0].id) <= (w[1].ts, w[1].id)));
    }

    #[tokio::test]
    async fn row_limit_keeps_the_newest_rows() {
        let memory = memory().await;
        for i in 0..10 {
            memory
                .append_message_at("chat", None, None, MessageRole::User, &format!("m{i}"), i)
                .await
                .unwrap();
        }

        let rows = memory
            .recent_messages("chat", RecentWindow::new(3, 100_000))
            .await
            .unwrap();
        let contents: Vec<&str> = rows.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m7", "m8", "m9"]);
    }

    #[tokio::test]
    async fn budget_keeps_oldest_of_window() {
        let memory = memory().await;
        // "USER(u): " is 9 chars, so each line renders to 30.
        for i in 0..5 {
            let content = format!("{i}{}", "x".repeat(20));
            memory
                .append_message_at("chat", None, Some("u"), MessageRole::User, &content, i)
                .await
                .unwrap();
        }

        let rows = memory
            .recent_messages("chat", RecentWindow::new(300, 50))
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].content.starts_with('0'));
        assert!(rows[1].content.starts_with('1'));
    }

    #[tokio::test]
    async fn latest_summary_prefers_newest_ts_then_id() {
        let memory = memory().await;
        assert_eq!(memory.latest_summary("chat").await.unwrap(), None);

        memory.insert_summary("chat", "old", 10).await.unwrap();
        memory.insert_summary("chat", "tie-first", 20).await.unwrap();
        memory.insert_summary("chat", "tie-second", 20).await.unwrap();
        memory.insert_summary("other", "elsewhere", 99).await.unwrap();

        assert_eq!(
            memory.latest_summary("chat").await.unwrap().as_deref(),
            Some("tie-second")
        );
    }

    #[tokio::test]
    async fn wipe_removes_only_that_chat() {
        let memory = memory().await;
        for chat in ["a", "b"] {
            memory
                .append_message(chat, None, None, MessageRole::User, "hi")
                .await
                .unwrap();
            memory.append_summary(chat, "notes").await.unwrap();
        }

        memory.wipe("a").await.unwrap();

        assert_eq!(memory.message_count("a").await.unwrap(), 0);
        assert_eq!(memory.latest_summary("a").await.unwrap(), None);
        assert_eq!(memory.message_count("b").await.unwrap(), 1);
        assert_eq!(
            memory.latest_summary("b").await.unwrap().as_deref(),
            Some("notes")
        );
        assert_eq!(memory.list_chats().await.unwrap(), vec!["b".to_string()]);
    }
}
