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

mod gateway;
mod openai;
pub mod retry;

pub use gateway::ModelGateway;
pub use openai::{OpenAIProvider, classify_status};
pub use retry::{FixedJitter, Jitter, RandomJitter, RetryPolicy, Sleeper, TokioSleeper};
