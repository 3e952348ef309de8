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

//! Telegram transport: long polling or webhook, commands and reply delivery.

mod bot;
mod command;
mod error;
mod handler;
pub mod inbound;
mod sink;
pub mod webhook;

pub use bot::{TelegramBot, connect};
pub use command::Command;
pub use error::{Error, Result};
pub use sink::TelegramSink;
pub use teloxide::Bot;
pub use webhook::WebhookSettings;
