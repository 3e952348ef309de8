use crate::inbound::to_event;
use crate::{Command, Result, TelegramBot};
use chatmind_core::{ConversationStore, LLMProvider};
use chatmind_conversation::{TurnOutcome, TurnReport};
use teloxide::{requests::Requester, types::Message};
use tracing::{debug, info};

fn username(msg: &Message) -> &str {
    msg.from
        .as_ref()
        .and_then(|u| u.username.as_deref())
        .unwrap_or("unknown")
}

fn log_report(username: &str, report: &TurnReport) {
    match &report.outcome {
        TurnOutcome::Replied { reply } => info!("[@{username}] Response: {reply}"),
        TurnOutcome::Failed { notice } => info!("[@{username}] Failed: {notice}"),
        TurnOutcome::Skipped => debug!("[@{username}] Stored without reply"),
        TurnOutcome::Cancelled => info!("[@{username}] Turn cancelled"),
    }
}

/// Handle bot commands. Commands are never stored as chat memory; only the
/// prompt of `/ai` becomes a turn.
pub async fn handle_command<P: LLMProvider + 'static>(
    bot: TelegramBot<P>,
    msg: Message,
    cmd: Command,
) -> Result<()> {
    let chat_id = msg.chat.id.0.to_string();
    let username = username(&msg);

    match cmd {
        Command::Start => {
            info!("[@{username}] Command: /start");
            bot.bot
                .send_message(msg.chat.id, Command::welcome_text())
                .await?;
        }
        Command::Help => {
            info!("[@{username}] Command: /help");
            bot.bot
                .send_message(msg.chat.id, Command::help_text())
                .await?;
        }
        Command::Wipe => {
            info!("[@{username}] Command: /wipe");
            bot.orchestrator.store().wipe(&chat_id).await?;
            bot.bot
                .send_message(msg.chat.id, "Memory for this chat has been wiped.")
                .await?;
        }
        Command::Ai(prompt) => {
            info!("[@{username}] Command: /ai {prompt}");
            if prompt.is_empty() {
                bot.bot
                    .send_message(msg.chat.id, Command::ai_usage_text())
                    .await?;
                return Ok(());
            }
            let event = to_event(&msg, Some(&prompt))?;
            let report = bot
                .orchestrator
                .handle_directed(event, &bot.sink, &bot.cancel)
                .await?;
            log_report(username, &report);
        }
    }

    Ok(())
}

/// Route a message to exactly one of the command handler or the
/// orchestrator.
pub async fn handle_message<P: LLMProvider + 'static>(
    bot: TelegramBot<P>,
    msg: Message,
) -> Result<()> {
    let Some(text) = msg.text() else {
        debug!("Ignoring non-text message in chat {}", msg.chat.id);
        return Ok(());
    };
    let username = username(&msg);

    let bot_name = bot.orchestrator.identity().username.as_deref().unwrap_or("");
    if let Some(cmd) = Command::parse_from_text(text, bot_name) {
        return handle_command(bot, msg, cmd).await;
    }

    info!("[@{username}] Message: {text}");

    let event = to_event(&msg, None)?;
    let report = bot
        .orchestrator
        .handle(event, &bot.sink, &bot.cancel)
        .await?;
    log_report(username, &report);

    Ok(())
}
