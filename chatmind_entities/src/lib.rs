//! sea-orm entities for the conversation log.

pub mod messages;
pub mod summaries;

/// DDL for both tables and their `(chat_id, ts)` indexes.
///
/// Every statement is idempotent so it can run on each startup.
pub const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        chat_id TEXT NOT NULL,
        user_id TEXT NULL,
        username TEXT NULL,
        role TEXT NOT NULL,
        content TEXT NOT NULL,
        ts INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_messages_chat_ts ON messages (chat_id, ts)",
    "CREATE TABLE IF NOT EXISTS summaries (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        chat_id TEXT NOT NULL,
        content TEXT NOT NULL,
        ts INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_summaries_chat_ts ON summaries (chat_id, ts)",
];
