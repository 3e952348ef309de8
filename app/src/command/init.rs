use chatmind_config::Config;

/// Strategy for initializing the configuration.
///
/// This strategy creates the default configuration file at `~/chatmind/config.json`.
#[derive(Debug, Clone, Copy)]
pub struct InitStrategy;

impl super::CommandStrategy for InitStrategy {
    type Input = ();

    async fn execute(&self, _input: Self::Input) -> anyhow::Result<()> {
        let config_path = Config::create_config()?;

        println!("✅ Created config file at: {}", config_path.display());
        println!();
        println!("📝 Next steps:");
        println!("   1. Add your OpenAI API key (or export OPENAI_API_KEY)");
        println!("   2. Add your Telegram bot token (or export BOT_TOKEN)");
        println!("   3. Run 'chatmind telegram' to start the bot, or 'chatmind chat' to try it locally");
        println!();
        println!("🔧 Configuration options:");
        println!("   - memory.recent_chars: characters of recent history sent with each prompt");
        println!("   - memory.summary_every_n_messages: how often a chat is summarized");
        println!("   - memory.keep_newest: keep the newest rows when history is cut");
        println!();
        Ok(())
    }
}
