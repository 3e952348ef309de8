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

mod command;

use clap::{Parser, Subcommand};
use command::{
    ChatInput, ChatStrategy, CommandStrategy, InfoStrategy, InitStrategy, TelegramInput,
    TelegramStrategy, VersionStrategy, WipeInput, WipeStrategy,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "chatmind")]
#[command(about = "Group-chat assistant with long-term memory", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration
    Init,
    /// Run the Telegram bot
    Telegram {
        /// Bot token (overrides config and BOT_TOKEN)
        #[arg(short, long)]
        token: Option<String>,

        /// Receive updates via webhook (PUBLIC_URL, PORT, WEBHOOK_SECRET)
        #[arg(long)]
        webhook: bool,
    },
    /// Chat locally as a private chat
    Chat {
        /// Chat id the conversation is stored under
        #[arg(short, long, default_value = "cli")]
        chat_id: String,

        /// Single message to send
        #[arg(short = 'm', long)]
        message: Option<String>,
    },
    /// Forget every message and summary of a chat
    Wipe {
        #[arg(short, long)]
        chat_id: String,
    },
    /// Show configuration and storage status
    Info,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => InitStrategy.execute(()).await,
        Commands::Telegram { token, webhook } => {
            TelegramStrategy
                .execute(TelegramInput { token, webhook })
                .await
        }
        Commands::Chat { chat_id, message } => {
            ChatStrategy
                .execute(ChatInput { chat_id, message })
                .await
        }
        Commands::Wipe { chat_id } => WipeStrategy.execute(WipeInput { chat_id }).await,
        Commands::Info => InfoStrategy.execute(()).await,
        Commands::Version => VersionStrategy.execute(()).await,
    }
}
