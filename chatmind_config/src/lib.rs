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

mod schema;

pub use schema::{
    AgentDefaults, AgentsConfig, Config, DatabaseConfig, MemoryConfig, OpenAIConfig,
    ProvidersConfig, ReplyConfig, TelegramConfig, WebhookConfig, BOT_TOKEN_ENV,
    OPENAI_API_KEY_ENV, PORT_ENV, PUBLIC_URL_ENV, WEBHOOK_SECRET_ENV,
};
