//! Turn orchestration: one inbound event in, at most one reply out.
//!
//! A turn moves through `Stored → PolicyEvaluated → (Skipped | Replying) →
//! SchedulerChecked`. The user's message is always stored, the reply is
//! emitted before the assistant message is written, and a due summary runs
//! in its own task so neither the reply nor the chat's next message waits
//! on it.

use chatmind_core::{
    BotIdentity, BudgetKeep, ConversationStore, GatewayError, InboundEvent, LLMProvider,
    MessageRole, RecentWindow, ValidationError,
};
use chatmind_providers::ModelGateway;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::history::ContextAssembler;
use crate::policy;
use crate::sink::ReplySink;
use crate::summarizer::{SummaryFailure, SummaryOutcome, Summarizer};

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant in a group chat. \
Use the chat memory to stay consistent with what people said earlier. \
Answer clearly and concisely.";

/// Settings for turn handling.
#[derive(Debug, Clone)]
pub struct ConversationConfig {
    /// Persona prompt sent as the first system message
    pub system_prompt: String,
    /// Character budget for recent messages in the context
    pub recent_chars: usize,
    /// Rows fetched before the character budget applies
    pub row_limit: usize,
    /// Which end of the row window survives the budget
    pub keep: BudgetKeep,
    /// Summarize whenever the message count hits a multiple of this
    pub summary_every_n_messages: u64,
    /// Longest reply handed back to the transport, in characters
    pub max_reply_chars: usize,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            recent_chars: 6000,
            row_limit: RecentWindow::DEFAULT_ROW_LIMIT,
            keep: BudgetKeep::Oldest,
            summary_every_n_messages: 80,
            max_reply_chars: 4096,
        }
    }
}

impl ConversationConfig {
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: String) -> Self {
        self.system_prompt = prompt;
        self
    }

    #[must_use]
    pub const fn with_recent_chars(mut self, chars: usize) -> Self {
        self.recent_chars = chars;
        self
    }

    #[must_use]
    pub const fn with_summary_every(mut self, n: u64) -> Self {
        self.summary_every_n_messages = n;
        self
    }

    #[must_use]
    pub const fn with_max_reply_chars(mut self, max: usize) -> Self {
        self.max_reply_chars = max;
        self
    }

    #[must_use]
    pub const fn recent_window(&self) -> RecentWindow {
        RecentWindow::new(self.row_limit, self.recent_chars).with_keep(self.keep)
    }
}

/// How the reply branch of a turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Stored silently; policy said not to answer.
    Skipped,
    /// The reply as emitted (already truncated).
    Replied { reply: String },
    /// The model failed for good; `notice` was emitted instead.
    Failed { notice: String },
    /// The turn was cancelled while waiting on the model.
    Cancelled,
}

#[derive(Debug)]
pub struct TurnReport {
    pub outcome: TurnOutcome,
    /// Background summarization started by this turn, if one was due.
    /// Dropping the handle leaves the task running.
    pub summary: Option<JoinHandle<SummaryOutcome>>,
}

impl TurnReport {
    #[must_use]
    pub const fn summary_scheduled(&self) -> bool {
        self.summary.is_some()
    }

    /// Wait for the turn's summarization, if any.
    pub async fn summary_outcome(self) -> SummaryOutcome {
        match self.summary {
            None => SummaryOutcome::NotDue,
            Some(task) => task
                .await
                .unwrap_or_else(|e| SummaryOutcome::Failed(SummaryFailure::Task(e.to_string()))),
        }
    }
}

/// Cut `text` to at most `max` characters.
#[must_use]
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}

pub struct TurnOrchestrator<P> {
    store: Arc<dyn ConversationStore>,
    gateway: Arc<ModelGateway<P>>,
    assembler: ContextAssembler,
    summarizer: Arc<Summarizer<P>>,
    identity: BotIdentity,
    config: ConversationConfig,
}

impl<P: LLMProvider + 'static> TurnOrchestrator<P> {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        gateway: ModelGateway<P>,
        identity: BotIdentity,
        config: ConversationConfig,
    ) -> Self {
        info!(
            "Creating turn orchestrator: model={}, recent_chars={}, summary every {} messages",
            gateway.model(),
            config.recent_chars,
            config.summary_every_n_messages
        );
        let gateway = Arc::new(gateway);
        let window = config.recent_window();
        let assembler = ContextAssembler::new(store.clone(), window);
        let summarizer = Arc::new(Summarizer::new(
            store.clone(),
            gateway.clone(),
            config.summary_every_n_messages,
            window,
        ));

        Self {
            store,
            gateway,
            assembler,
            summarizer,
            identity,
            config,
        }
    }

    #[must_use]
    pub const fn identity(&self) -> &BotIdentity {
        &self.identity
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    /// Handle an ordinary inbound message.
    pub async fn handle(
        &self,
        event: InboundEvent,
        sink: &dyn ReplySink,
        cancel: &CancellationToken,
    ) -> Result<TurnReport, ValidationError> {
        self.run_turn(event, false, sink, cancel).await
    }

    /// Handle a message that explicitly asks the bot for an answer, so the
    /// reply policy is not consulted.
    pub async fn handle_directed(
        &self,
        event: InboundEvent,
        sink: &dyn ReplySink,
        cancel: &CancellationToken,
    ) -> Result<TurnReport, ValidationError> {
        self.run_turn(event, true, sink, cancel).await
    }

    async fn run_turn(
        &self,
        event: InboundEvent,
        directed: bool,
        sink: &dyn ReplySink,
        cancel: &CancellationToken,
    ) -> Result<TurnReport, ValidationError> {
        let event = event.validate()?;
        let chat_id = event.chat_id.as_str();
        let mut summary_due = false;

        match self
            .store
            .append_message(
                chat_id,
                event.user_id(),
                event.username(),
                MessageRole::User,
                &event.text,
            )
            .await
        {
            Ok(id) => {
                debug!("Stored user message {id} in chat {chat_id}");
                summary_due |= self.summarizer.is_due_now(chat_id).await;
            }
            Err(e) => error!("Failed to store user message in chat {chat_id}: {e}"),
        }

        let reason = policy::decide_turn(&event, &self.identity, directed);

        let outcome = match reason {
            None => {
                debug!("Chat {chat_id}: no reply needed, message kept as memory");
                TurnOutcome::Skipped
            }
            Some(reason) => {
                debug!("Chat {chat_id}: replying ({reason:?})");
                let (outcome, stored) = self.reply(&event, sink, cancel).await;
                if stored {
                    summary_due |= self.summarizer.is_due_now(chat_id).await;
                }
                outcome
            }
        };

        let summary = if !summary_due {
            None
        } else if cancel.is_cancelled() {
            info!("Chat {chat_id}: summary due but the turn was cancelled, skipping");
            None
        } else {
            Some(self.spawn_summary(chat_id, cancel))
        };

        Ok(TurnReport { outcome, summary })
    }

    fn spawn_summary(
        &self,
        chat_id: &str,
        cancel: &CancellationToken,
    ) -> JoinHandle<SummaryOutcome> {
        let summarizer = Arc::clone(&self.summarizer);
        let chat_id = chat_id.to_string();
        let cancel = cancel.clone();
        tokio::spawn(async move { summarizer.run(&chat_id, &cancel).await })
    }

    /// Generate, emit and store a reply. Returns the outcome and whether an
    /// assistant message was written.
    async fn reply(
        &self,
        event: &InboundEvent,
        sink: &dyn ReplySink,
        cancel: &CancellationToken,
    ) -> (TurnOutcome, bool) {
        let chat_id = event.chat_id.as_str();
        sink.typing(chat_id).await;

        let context = self.assembler.build(chat_id).await;
        let messages = ModelGateway::<P>::compose(
            &self.config.system_prompt,
            Some(&context),
            &event.text,
        );

        let reply = match self.gateway.invoke_cancellable(&messages, cancel).await {
            Ok(reply) => reply,
            Err(GatewayError::Cancelled) => {
                info!("Turn in chat {chat_id} cancelled before a reply was produced");
                return (TurnOutcome::Cancelled, false);
            }
            Err(e) => {
                error!("Model failed for chat {chat_id}: {e}");
                let notice =
                    truncate_chars(&format!("LLM error: {e}"), self.config.max_reply_chars);
                if let Err(send_err) = sink.emit(chat_id, &notice).await {
                    warn!("Failed to deliver error notice to chat {chat_id}: {send_err}");
                }
                return (TurnOutcome::Failed { notice }, false);
            }
        };

        let emitted = truncate_chars(&reply, self.config.max_reply_chars);
        if let Err(e) = sink.emit(chat_id, &emitted).await {
            warn!("Failed to deliver reply to chat {chat_id}: {e}");
        }

        let stored = match self
            .store
            .append_message(
                chat_id,
                None,
                Some(self.identity.username.as_deref().unwrap_or("assistant")),
                MessageRole::Assistant,
                &reply,
            )
            .await
        {
            Ok(id) => {
                debug!("Stored assistant message {id} in chat {chat_id}");
                true
            }
            Err(e) => {
                error!("Failed to store assistant reply in chat {chat_id}: {e}");
                false
            }
        };

        (TurnOutcome::Replied { reply: emitted }, stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_counts_characters() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("exact", 5), "exact");
        assert_eq!(truncate_chars("", 0), "");
    }

    #[test]
    fn config_window_follows_settings() {
        let config = ConversationConfig::default().with_recent_chars(1234);
        let window = config.recent_window();
        assert_eq!(window.char_budget, 1234);
        assert_eq!(window.row_limit, 300);
        assert_eq!(window.keep, BudgetKeep::Oldest);
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = ConversationConfig::default();
        assert_eq!(config.recent_chars, 6000);
        assert_eq!(config.summary_every_n_messages, 80);
        assert_eq!(config.max_reply_chars, 4096);
    }
}
