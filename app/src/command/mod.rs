//! Static strategy pattern for CLI commands.
//!
//! Each command is a separate strategy with its own input type, dispatched
//! statically from `main`.

use chatmind_config::Config;
use chatmind_conversation::{ConversationConfig, DEFAULT_SYSTEM_PROMPT, TurnOrchestrator};
use chatmind_core::BotIdentity;
use chatmind_memory::ChatMemory;
use chatmind_providers::{ModelGateway, OpenAIProvider};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

mod chat;
mod info;
mod init;
mod telegram;
mod version;
mod wipe;

pub use chat::{ChatInput, ChatStrategy};
pub use info::InfoStrategy;
pub use init::InitStrategy;
pub use telegram::{TelegramInput, TelegramStrategy};
pub use version::VersionStrategy;
pub use wipe::{WipeInput, WipeStrategy};

/// Everything a command needs once config and storage are up.
pub struct CommonComponents {
    pub config: Config,
    pub store: Arc<ChatMemory>,
}

/// Load config and open the database.
pub async fn init_common_components() -> anyhow::Result<CommonComponents> {
    let config = Config::load()?;
    Config::ensure_config_dir()?;
    let store = Arc::new(connect_store_with_retry(&config.database.url).await?);
    Ok(CommonComponents { config, store })
}

/// Open the store, retrying with a growing delay.
///
/// # Retry Behavior
/// - First retry: 1s
/// - Second retry: 2s
/// - Third and beyond: 3s (capped)
/// - Gives up after five attempts
async fn connect_store_with_retry(database_url: &str) -> anyhow::Result<ChatMemory> {
    const MAX_DELAY: Duration = Duration::from_secs(3);
    const INITIAL_DELAY: Duration = Duration::from_secs(1);
    const MAX_ATTEMPTS: u32 = 5;

    let mut attempt = 0u32;
    let mut delay = INITIAL_DELAY;

    loop {
        attempt += 1;
        match ChatMemory::connect(database_url).await {
            Ok(store) => {
                info!("Chat memory connected on attempt {attempt}");
                return Ok(store);
            }
            Err(e) if attempt >= MAX_ATTEMPTS => {
                return Err(e.context(format!("giving up after {attempt} attempts")));
            }
            Err(e) => {
                warn!(
                    "Failed to open database (attempt {attempt}): {e}. Retrying in {}s...",
                    delay.as_secs()
                );
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
        }
    }
}

pub fn build_conversation_config(config: &Config) -> ConversationConfig {
    ConversationConfig {
        system_prompt: config.system_prompt_or(DEFAULT_SYSTEM_PROMPT).to_string(),
        recent_chars: config.memory.recent_chars,
        row_limit: config.memory.row_limit,
        keep: config.memory.keep(),
        summary_every_n_messages: config.memory.summary_every_n_messages,
        max_reply_chars: config.reply.max_reply_chars,
    }
}

pub fn build_orchestrator(
    common: &CommonComponents,
    identity: BotIdentity,
) -> TurnOrchestrator<OpenAIProvider> {
    let openai = &common.config.providers.openai;
    let mut provider = OpenAIProvider::new(openai.api_key.clone());
    if let Some(base_url) = &openai.base_url {
        provider = provider.with_base_url(base_url.clone());
    }
    let gateway = ModelGateway::new(provider, common.config.agents.defaults.model.clone());

    TurnOrchestrator::new(
        common.store.clone(),
        gateway,
        identity,
        build_conversation_config(&common.config),
    )
}

/// Core trait defining the contract for all command strategies.
///
/// Each strategy defines its own input type, so parameters are passed
/// without runtime casting or boxing.
pub trait CommandStrategy: Send + Sync + 'static {
    type Input;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()>;
}
