use chatmind_core::{StorageError, ValidationError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Telegram API error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Invalid message: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid chat id: {0}")]
    ChatId(String),

    #[error("Webhook error: {0}")]
    Webhook(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
