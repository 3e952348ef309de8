use crate::command::{CommandStrategy, build_orchestrator, init_common_components};
use chatmind_config::WebhookConfig;
use chatmind_telegram::{Bot, TelegramBot, WebhookSettings, connect};
use std::sync::Arc;
use tracing::info;

/// Input for Telegram bot command.
pub struct TelegramInput {
    /// Optional bot token (overrides config)
    pub token: Option<String>,
    /// Receive updates through a webhook instead of long polling
    pub webhook: bool,
}

fn webhook_settings(config: &WebhookConfig) -> anyhow::Result<WebhookSettings> {
    let Some(public_url) = config.public_url.as_deref() else {
        anyhow::bail!(
            "Webhook mode needs a public URL. Set \"telegram.webhook.public_url\" in config or PUBLIC_URL"
        );
    };
    Ok(WebhookSettings::new(public_url, config.port)
        .with_secret(config.secret().map(str::to_string)))
}

/// Strategy for running the Telegram bot.
pub struct TelegramStrategy;

impl CommandStrategy for TelegramStrategy {
    type Input = TelegramInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let common = init_common_components().await?;

        if !common.config.telegram.enabled {
            anyhow::bail!("Telegram is not enabled in config. Set \"telegram.enabled\": true");
        }

        let token = match input.token.or_else(|| common.config.telegram.token.clone()) {
            Some(t) if !t.trim().is_empty() => t,
            _ => anyhow::bail!(
                "Telegram bot token not configured. Set \"telegram.token\" in config or BOT_TOKEN"
            ),
        };

        let webhook = if input.webhook {
            Some(webhook_settings(&common.config.telegram.webhook)?)
        } else {
            None
        };

        info!("Starting Telegram bot...");
        let bot = Bot::new(token.clone());
        let identity = connect(&bot).await;
        let orchestrator = Arc::new(build_orchestrator(&common, identity));

        info!("Telegram bot is running. Press Ctrl+C to stop.");
        let telegram = TelegramBot::new(bot, orchestrator);
        match webhook {
            Some(settings) => telegram.run_webhook(&token, settings).await?,
            None => telegram.run().await?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn webhook_mode_requires_a_public_url() {
        assert!(webhook_settings(&WebhookConfig::default()).is_err());
    }

    #[test]
    fn webhook_settings_follow_config() {
        let config = WebhookConfig {
            public_url: Some("https://bot.example.com".to_string()),
            port: 8443,
            secret: Some(String::new()),
        };
        let settings = webhook_settings(&config).unwrap();
        assert_eq!(settings.public_url, "https://bot.example.com");
        assert_eq!(settings.port, 8443);
        assert!(settings.secret.is_none());
    }
}
