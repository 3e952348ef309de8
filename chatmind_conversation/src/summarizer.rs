//! Periodic compression of chat history into durable notes.

use chatmind_core::{
    ConversationStore, GatewayError, LLMProvider, RecentWindow, StorageError, render_lines,
};
use chatmind_providers::ModelGateway;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Instruction given to the model when summarizing.
pub const SUMMARY_PROMPT: &str = "Compress the conversation below into durable notes: \
participants, preferences, decisions, tasks, links, stable facts. \
Keep it under ~600 words. Merge with what is already known; don't repeat.";

/// Smallest character budget used for the summarization transcript.
pub const MIN_SUMMARY_CHARS: usize = 16_000;

/// `count` is a positive multiple of `every_n`.
#[must_use]
pub const fn is_due(count: u64, every_n: u64) -> bool {
    every_n > 0 && count > 0 && count % every_n == 0
}

#[derive(Debug, Error)]
pub enum SummaryFailure {
    #[error("storage: {0}")]
    Storage(#[from] StorageError),

    #[error("model: {0}")]
    Gateway(#[from] GatewayError),

    #[error("no history to summarize")]
    EmptyHistory,

    #[error("summary task ended abnormally: {0}")]
    Task(String),
}

/// What a scheduler check did.
#[derive(Debug)]
pub enum SummaryOutcome {
    NotDue,
    Written { summary_id: i64 },
    Failed(SummaryFailure),
}

pub struct Summarizer<P> {
    store: Arc<dyn ConversationStore>,
    gateway: Arc<ModelGateway<P>>,
    every_n: u64,
    window: RecentWindow,
}

impl<P: LLMProvider> Summarizer<P> {
    /// `recent_chars` is the conversational budget; the transcript gets
    /// three times that, and never less than [`MIN_SUMMARY_CHARS`].
    #[must_use]
    pub fn new(
        store: Arc<dyn ConversationStore>,
        gateway: Arc<ModelGateway<P>>,
        every_n: u64,
        recent_window: RecentWindow,
    ) -> Self {
        let budget = (recent_window.char_budget * 3).max(MIN_SUMMARY_CHARS);
        Self {
            store,
            gateway,
            every_n,
            window: RecentWindow::new(recent_window.row_limit, budget)
                .with_keep(recent_window.keep),
        }
    }

    /// Whether the chat's current message count calls for a summary.
    /// A failed count read is logged and treated as not due.
    pub async fn is_due_now(&self, chat_id: &str) -> bool {
        match self.store.message_count(chat_id).await {
            Ok(count) => {
                let due = is_due(count, self.every_n);
                if due {
                    debug!("Chat {chat_id} reached {count} messages, summary due");
                }
                due
            }
            Err(e) => {
                warn!("Message count failed for chat {chat_id}, skipping summary check: {e}");
                false
            }
        }
    }

    /// Check the count and summarize when due.
    pub async fn maybe_run(&self, chat_id: &str, cancel: &CancellationToken) -> SummaryOutcome {
        if self.is_due_now(chat_id).await {
            self.run(chat_id, cancel).await
        } else {
            SummaryOutcome::NotDue
        }
    }

    /// Summarize unconditionally. Failures are logged here, once, and
    /// returned as [`SummaryOutcome::Failed`]. The model call is abandoned
    /// when `cancel` fires.
    pub async fn run(&self, chat_id: &str, cancel: &CancellationToken) -> SummaryOutcome {
        match self.summarize(chat_id, cancel).await {
            Ok(summary_id) => {
                info!("Summarized chat {chat_id} into summary {summary_id}");
                SummaryOutcome::Written { summary_id }
            }
            Err(SummaryFailure::Gateway(GatewayError::Cancelled)) => {
                info!("Summarization of chat {chat_id} cancelled");
                SummaryOutcome::Failed(SummaryFailure::Gateway(GatewayError::Cancelled))
            }
            Err(failure) => {
                warn!("Summarization failed for chat {chat_id}: {failure}");
                SummaryOutcome::Failed(failure)
            }
        }
    }

    async fn summarize(
        &self,
        chat_id: &str,
        cancel: &CancellationToken,
    ) -> Result<i64, SummaryFailure> {
        let rows = self.store.recent_messages(chat_id, self.window).await?;
        if rows.is_empty() {
            return Err(SummaryFailure::EmptyHistory);
        }

        let transcript = render_lines(&rows);
        let messages = ModelGateway::<P>::compose(SUMMARY_PROMPT, None, &transcript);
        let summary = self.gateway.invoke_cancellable(&messages, cancel).await?;
        Ok(self.store.append_summary(chat_id, &summary).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Small deterministic generator for the randomized count check.
    fn lcg(state: &mut u64) -> u64 {
        *state = state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        *state >> 33
    }

    #[test]
    fn due_exactly_on_positive_multiples() {
        assert!(!is_due(0, 80));
        assert!(!is_due(79, 80));
        assert!(is_due(80, 80));
        assert!(!is_due(81, 80));
        assert!(is_due(160, 80));
        assert!(!is_due(5, 0));
    }

    #[test]
    fn randomized_append_sequences_trigger_on_multiples() {
        let mut state = 99;
        for n in [1_u64, 2, 7, 80, 123] {
            for _ in 0..20 {
                let length = lcg(&mut state) % 501;
                let mut triggers = Vec::new();
                for count in 1..=length {
                    if is_due(count, n) {
                        triggers.push(count);
                    }
                }
                let expected: Vec<u64> = (1..=length).filter(|c| c % n == 0).collect();
                assert_eq!(triggers, expected);
                assert_eq!(triggers.len() as u64, length / n);
            }
        }
    }

    #[test]
    fn failures_describe_their_cause() {
        let failure = SummaryFailure::Gateway(GatewayError::Cancelled);
        assert_eq!(failure.to_string(), "model: request cancelled");
        assert_eq!(
            SummaryFailure::EmptyHistory.to_string(),
            "no history to summarize"
        );
    }
}
