#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod error;
pub mod event;
pub mod history;

pub use error::{GatewayError, StorageError, ValidationError};
pub use event::{BotIdentity, ChatType, EntityKind, InboundEvent, MessageEntity, ReplyRef, Sender};
pub use history::{BudgetKeep, MessageRole, RecentWindow, StoredMessage, render_lines};

/// Role of a message sent to the model.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LLMResponse {
    pub content: String,
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A hosted chat model.
///
/// Implementations classify their failures into [`GatewayError::RateLimited`],
/// [`GatewayError::Transient`] or [`GatewayError::Fatal`]; retrying is left to
/// the caller.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    async fn chat(&self, messages: &[ChatMessage], model: &str)
    -> Result<LLMResponse, GatewayError>;
    fn get_default_model(&self) -> &str;
}

/// Durable per-chat log of messages and summaries.
///
/// Every call is independently scoped: nothing is held across calls, and a
/// write is visible to any read issued after it returns.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn append_message(
        &self,
        chat_id: &str,
        user_id: Option<&str>,
        username: Option<&str>,
        role: MessageRole,
        content: &str,
    ) -> Result<i64, StorageError>;

    /// Recent messages of a chat in ascending `(ts, id)` order, trimmed to
    /// the window's character budget.
    async fn recent_messages(
        &self,
        chat_id: &str,
        window: RecentWindow,
    ) -> Result<Vec<StoredMessage>, StorageError>;

    async fn latest_summary(&self, chat_id: &str) -> Result<Option<String>, StorageError>;

    async fn append_summary(&self, chat_id: &str, content: &str) -> Result<i64, StorageError>;

    async fn message_count(&self, chat_id: &str) -> Result<u64, StorageError>;

    /// Remove every message and summary of a chat in one transaction.
    async fn wipe(&self, chat_id: &str) -> Result<(), StorageError>;
}

#[async_trait]
impl<T: ConversationStore + ?Sized> ConversationStore for std::sync::Arc<T> {
    async fn append_message(
        &self,
        chat_id: &str,
        user_id: Option<&str>,
        username: Option<&str>,
        role: MessageRole,
        content: &str,
    ) -> Result<i64, StorageError> {
        (**self)
            .append_message(chat_id, user_id, username, role, content)
            .await
    }

    async fn recent_messages(
        &self,
        chat_id: &str,
        window: RecentWindow,
    ) -> Result<Vec<StoredMessage>, StorageError> {
        (**self).recent_messages(chat_id, window).await
    }

    async fn latest_summary(&self, chat_id: &str) -> Result<Option<String>, StorageError> {
        (**self).latest_summary(chat_id).await
    }

    async fn append_summary(&self, chat_id: &str, content: &str) -> Result<i64, StorageError> {
        (**self).append_summary(chat_id, content).await
    }

    async fn message_count(&self, chat_id: &str) -> Result<u64, StorageError> {
        (**self).message_count(chat_id).await
    }

    async fn wipe(&self, chat_id: &str) -> Result<(), StorageError> {
        (**self).wipe(chat_id).await
    }
}
