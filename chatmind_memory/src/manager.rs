use chatmind_core::{MessageRole, StorageError, StoredMessage};
use chatmind_entities::{SCHEMA, messages, summaries};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::{debug, info};

use crate::convert;

/// Durable per-chat message and summary log.
///
/// Every method runs its own statement (or transaction) against the pool;
/// nothing is held between calls.
pub struct ChatMemory {
    pub(crate) db: DatabaseConnection,
}

impl ChatMemory {
    /// Connect to a SQLite database and make sure the schema exists.
    ///
    /// # Arguments
    /// * `database_url` - e.g. `sqlite:///home/me/chatmind/memory.db?mode=rwc`
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        info!("Connecting to database for ChatMemory");
        let mut options = ConnectOptions::new(database_url.to_owned());
        options.sqlx_logging(false);
        let db = Database::connect(options).await?;
        let memory = Self { db };
        memory.init_schema().await?;
        info!("ChatMemory initialized");
        Ok(memory)
    }

    /// A private in-memory database, mostly for tests and dry runs.
    ///
    /// The pool is pinned to one connection because every SQLite
    /// `:memory:` connection is its own database.
    pub async fn in_memory() -> anyhow::Result<Self> {
        let mut options = ConnectOptions::new("sqlite::memory:".to_owned());
        options.max_connections(1).min_connections(1).sqlx_logging(false);
        let db = Database::connect(options).await?;
        let memory = Self { db };
        memory.init_schema().await?;
        Ok(memory)
    }

    async fn init_schema(&self) -> anyhow::Result<()> {
        for statement in SCHEMA {
            self.db.execute_unprepared(statement).await?;
        }
        debug!("Schema ready ({} statements)", SCHEMA.len());
        Ok(())
    }

    /// Append a message with an explicit timestamp (epoch seconds).
    pub async fn append_message_at(
        &self,
        chat_id: &str,
        user_id: Option<&str>,
        username: Option<&str>,
        role: MessageRole,
        content: &str,
        ts: i64,
    ) -> Result<i64, StorageError> {
        if content.is_empty() {
            return Err(StorageError::EmptyContent);
        }

        let model = messages::ActiveModel {
            chat_id: Set(chat_id.to_owned()),
            user_id: Set(user_id.map(str::to_owned)),
            username: Set(username.map(str::to_owned)),
            role: Set(role.as_str().to_owned()),
            content: Set(content.to_owned()),
            ts: Set(ts),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(StorageError::database)?;

        debug!("Stored {role} message {} in chat {chat_id}", model.id);
        Ok(model.id)
    }

    /// Newest `row_limit` messages of a chat, returned oldest first.
    pub(crate) async fn fetch_window(
        &self,
        chat_id: &str,
        row_limit: usize,
    ) -> Result<Vec<StoredMessage>, StorageError> {
        let limit = u64::try_from(row_limit).unwrap_or(u64::MAX);
        let mut rows: Vec<StoredMessage> = messages::Entity::find()
            .filter(messages::Column::ChatId.eq(chat_id))
            .order_by_desc(messages::Column::Ts)
            .order_by_desc(messages::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(StorageError::database)?
            .into_iter()
            .map(convert::stored_message_from_model)
            .collect();

        rows.reverse();
        Ok(rows)
    }

    pub(crate) async fn latest_summary_row(
        &self,
        chat_id: &str,
    ) -> Result<Option<summaries::Model>, StorageError> {
        summaries::Entity::find()
            .filter(summaries::Column::ChatId.eq(chat_id))
            .order_by_desc(summaries::Column::Ts)
            .order_by_desc(summaries::Column::Id)
            .one(&self.db)
            .await
            .map_err(StorageError::database)
    }

    pub(crate) async fn insert_summary(
        &self,
        chat_id: &str,
        content: &str,
        ts: i64,
    ) -> Result<i64, StorageError> {
        let model = summaries::ActiveModel {
            chat_id: Set(chat_id.to_owned()),
            content: Set(content.to_owned()),
            ts: Set(ts),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(StorageError::database)?;

        info!("Stored summary {} for chat {chat_id}", model.id);
        Ok(model.id)
    }

    pub(crate) async fn count_messages(&self, chat_id: &str) -> Result<u64, StorageError> {
        messages::Entity::find()
            .filter(messages::Column::ChatId.eq(chat_id))
            .count(&self.db)
            .await
            .map_err(StorageError::database)
    }

    /// Delete every message and summary of a chat in one transaction.
    pub(crate) async fn delete_chat(&self, chat_id: &str) -> Result<(), StorageError> {
        let txn = self.db.begin().await.map_err(StorageError::database)?;

        let removed_messages = messages::Entity::delete_many()
            .filter(messages::Column::ChatId.eq(chat_id))
            .exec(&txn)
            .await
            .map_err(StorageError::database)?
            .rows_affected;
        let removed_summaries = summaries::Entity::delete_many()
            .filter(summaries::Column::ChatId.eq(chat_id))
            .exec(&txn)
            .await
            .map_err(StorageError::database)?
            .rows_affected;

        txn.commit().await.map_err(StorageError::database)?;

        info!(
            "Wiped chat {chat_id}: {removed_messages} messages, {removed_summaries} summaries"
        );
        Ok(())
    }

    /// Distinct chat ids that have stored messages.
    pub async fn list_chats(&self) -> Result<Vec<String>, StorageError> {
        messages::Entity::find()
            .select_only()
            .column(messages::Column::ChatId)
            .distinct()
            .into_tuple::<String>()
            .all(&self.db)
            .await
            .map_err(StorageError::database)
    }
}
