//! Local chat through the same orchestrator the bot uses.
//!
//! The terminal behaves as a private chat, so every line gets a reply and
//! every exchange lands in the chat's memory.

use async_trait::async_trait;
use chatmind_conversation::{
    ReplySink, SummaryOutcome, TurnOrchestrator, TurnOutcome, TurnReport,
};
use chatmind_core::{
    BotIdentity, ChatType, ConversationStore, InboundEvent, LLMProvider, Sender,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{build_orchestrator, init_common_components};

/// Input parameters for the Chat command strategy.
#[derive(Debug, Clone)]
pub struct ChatInput {
    /// Chat id the conversation is stored under
    pub chat_id: String,
    /// Optional single message to send (non-interactive mode)
    pub message: Option<String>,
}

/// Prints replies to stdout.
struct StdoutSink;

#[async_trait]
impl ReplySink for StdoutSink {
    async fn emit(&self, _chat_id: &str, text: &str) -> anyhow::Result<()> {
        println!("{text}\n");
        Ok(())
    }
}

fn local_user() -> Sender {
    Sender {
        id: "local".to_string(),
        username: std::env::var("USER").ok().filter(|u| !u.is_empty()),
    }
}

async fn send<P: LLMProvider + 'static>(
    orchestrator: &TurnOrchestrator<P>,
    chat_id: &str,
    text: &str,
    cancel: &CancellationToken,
) -> anyhow::Result<TurnReport> {
    let event = InboundEvent::text(chat_id, ChatType::Private, Some(local_user()), text);
    Ok(orchestrator.handle(event, &StdoutSink, cancel).await?)
}

/// Strategy for executing the Chat command.
#[derive(Debug, Clone, Copy)]
pub struct ChatStrategy;

impl super::CommandStrategy for ChatStrategy {
    type Input = ChatInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let common = init_common_components().await?;
        let identity = BotIdentity {
            id: "local-bot".to_string(),
            username: Some("chatmind".to_string()),
        };
        let orchestrator = build_orchestrator(&common, identity);
        let cancel = CancellationToken::new();

        if let Some(msg) = input.message {
            let report = send(&orchestrator, &input.chat_id, &msg, &cancel).await?;
            let failure = match &report.outcome {
                TurnOutcome::Failed { notice } => Some(notice.clone()),
                _ => None,
            };
            // The process exits next; let a due summary finish first.
            if let SummaryOutcome::Failed(e) = report.summary_outcome().await {
                warn!("Summary not written: {e}");
            }
            if let Some(notice) = failure {
                anyhow::bail!(notice);
            }
            return Ok(());
        }

        info!("Starting local chat in chat {}", input.chat_id);
        println!("Chatting as a private chat. Type 'exit' or press Ctrl+D to quit.\n");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let line = tokio::select! {
                line = lines.next_line() => line?,
                _ = tokio::signal::ctrl_c() => {
                    cancel.cancel();
                    None
                }
            };
            let Some(line) = line else {
                break;
            };

            let text = line.trim();
            if text.is_empty() {
                continue;
            }
            if matches!(text, "exit" | "quit") {
                break;
            }

            if let Err(e) = send(&orchestrator, &input.chat_id, text, &cancel).await {
                warn!("Turn failed: {e}");
            }
        }

        let count = common.store.message_count(&input.chat_id).await?;
        info!("Conversation ended: {count} messages stored");
        Ok(())
    }
}
