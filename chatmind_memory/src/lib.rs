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

//! SQLite-backed conversation log.
//!
//! [`ChatMemory`] owns the `messages` and `summaries` tables and implements
//! [`ConversationStore`] on top of sea-orm.

mod convert;
mod manager;
mod session;

pub use chatmind_core::ConversationStore;
pub use manager::ChatMemory;
