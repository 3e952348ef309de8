use thiserror::Error;

/// A read or write against the conversation store could not be completed.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(String),

    #[error("message content must not be empty")]
    EmptyContent,
}

impl StorageError {
    pub fn database(err: impl std::fmt::Display) -> Self {
        Self::Database(err.to_string())
    }
}

/// Failure of a model invocation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("transient API error: {0}")]
    Transient(String),

    #[error("{0}")]
    Fatal(String),

    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        last: Box<GatewayError>,
    },

    #[error("request cancelled")]
    Cancelled,
}

impl GatewayError {
    /// Whether this error calls for exponential backoff rather than the
    /// fixed retry delay.
    #[must_use]
    pub const fn wants_backoff(&self) -> bool {
        matches!(self, Self::RateLimited(_) | Self::Transient(_))
    }

    /// Errors the gateway never retries past.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Exhausted { .. } | Self::Cancelled)
    }
}

/// An inbound event that cannot be turned into a conversational turn.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing chat id")]
    MissingChatId,

    #[error("message has no text")]
    EmptyText,

    #[error("unsupported chat type: {0}")]
    UnsupportedChatType(String),
}
