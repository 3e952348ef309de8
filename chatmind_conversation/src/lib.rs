#![warn(
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

//! Group-chat conversation handling on top of persistent history.
//!
//! Every inbound message is remembered; only some get a reply.
//!
//! # Key Features
//! - Reply policy for private chats, mentions and replies to the bot
//! - Context built from the latest summary plus a character-bounded window
//! - Periodic summarization every N stored messages
//! - Cancellable model calls with retry handled by the gateway

mod history;
mod manager;
pub mod policy;
mod sink;
mod summarizer;

pub use history::{ContextAssembler, RECENT_SEPARATOR};
pub use manager::{
    ConversationConfig, DEFAULT_SYSTEM_PROMPT, TurnOrchestrator, TurnOutcome, TurnReport,
    truncate_chars,
};
pub use policy::{ReplyReason, decide, decide_turn, should_respond};
pub use sink::ReplySink;
pub use summarizer::{
    MIN_SUMMARY_CHARS, SUMMARY_PROMPT, Summarizer, SummaryFailure, SummaryOutcome, is_due,
};
