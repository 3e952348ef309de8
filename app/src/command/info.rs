use chatmind_config::Config;
use chatmind_core::ConversationStore;
use chatmind_memory::ChatMemory;
use tracing::info;

/// Strategy for displaying configuration information.
///
/// This strategy outputs:
/// - API key and bot token (masked)
/// - Database URL, connection status and per-chat message counts
/// - Agent, memory and reply settings
#[derive(Debug, Clone, Copy)]
pub struct InfoStrategy;

impl super::CommandStrategy for InfoStrategy {
    type Input = ();

    async fn execute(&self, _input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;

        println!("=== chatmind Configuration ===\n");

        println!("API Key:");
        println!("  OpenAI: {}", mask_secret(&config.providers.openai.api_key));
        if let Some(base_url) = &config.providers.openai.base_url {
            println!("  Base URL: {base_url}");
        }
        println!();

        println!("Database:");
        let db_url = &config.database.url;
        println!("  URL: {db_url}");

        info!("Testing database connection");
        match ChatMemory::connect(db_url).await {
            Ok(store) => {
                println!("  Status: Connected");
                print_chats(&store).await;
            }
            Err(e) => {
                println!("  Status: Connection failed");
                println!("  Error: {e}");
            }
        }
        println!();

        println!("Agent Defaults:");
        println!("  Model: {}", config.agents.defaults.model);
        if let Some(ref prompt) = config.agents.defaults.system_prompt {
            println!("  System Prompt: {}", truncate(prompt, 60));
        }
        println!();

        println!("Memory:");
        println!("  Recent Chars: {}", config.memory.recent_chars);
        println!("  Row Limit: {}", config.memory.row_limit);
        println!(
            "  Summary Every: {} messages",
            config.memory.summary_every_n_messages
        );
        println!("  Keep: {:?}", config.memory.keep());
        println!("  Max Reply Chars: {}", config.reply.max_reply_chars);
        println!();

        println!("Telegram:");
        println!("  Enabled: {}", config.telegram.enabled);
        let token = config
            .telegram
            .token
            .as_deref()
            .map_or_else(|| "(not set)".to_string(), mask_secret);
        println!("  Token: {token}");

        Ok(())
    }
}

async fn print_chats(store: &ChatMemory) {
    let chats = match store.list_chats().await {
        Ok(chats) => chats,
        Err(e) => {
            println!("  Chats: unavailable ({e})");
            return;
        }
    };
    println!("  Chats: {}", chats.len());
    for chat_id in chats {
        let count = store.message_count(&chat_id).await.unwrap_or_default();
        let summary = match store.latest_summary(&chat_id).await {
            Ok(Some(_)) => "summarized",
            _ => "no summary",
        };
        println!("    {chat_id}: {count} messages, {summary}");
    }
}

fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else if chars.is_empty() {
        "(not set)".to_string()
    } else {
        "***".to_string()
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{head}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_are_masked() {
        assert_eq!(mask_secret("sk-1234567890abcd"), "sk-1...abcd");
        assert_eq!(mask_secret("short"), "***");
        assert_eq!(mask_secret(""), "(not set)");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo wörld", 8), "héllo...");
        assert_eq!(truncate("short", 60), "short");
    }
}
