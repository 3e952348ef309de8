use crate::webhook::{self, WebhookSettings};
use crate::{Command, Error, Result, TelegramSink};
use axum::{Router, middleware, routing::get};
use chatmind_conversation::TurnOrchestrator;
use chatmind_core::{BotIdentity, LLMProvider};
use std::{sync::Arc, time::Duration};
use teloxide::dispatching::{Dispatcher, UpdateFilterExt, UpdateHandler};
use teloxide::dptree;
use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::prelude::*;
use teloxide::types::{Message, Update};
use teloxide::update_listeners::webhooks::{self, Options};
use tokio::net::TcpListener;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Telegram front end for a [`TurnOrchestrator`].
pub struct TelegramBot<P> {
    /// Teloxide bot instance
    pub bot: Bot,
    pub(crate) orchestrator: Arc<TurnOrchestrator<P>>,
    pub(crate) sink: TelegramSink,
    /// Cancelled on shutdown; aborts in-flight model calls
    pub(crate) cancel: CancellationToken,
}

/// Reach the Bot API, retrying with a linear backoff (2s, 4s, ... capped at
/// 10s) until it answers, and return the bot's own identity.
pub async fn connect(bot: &Bot) -> BotIdentity {
    const INITIAL_DELAY_SECS: u64 = 2;
    const MAX_DELAY_SECS: u64 = 10;

    let mut attempt = 1u64;
    loop {
        match bot.get_me().await {
            Ok(me) => {
                info!(
                    "Connected to Telegram API: @{} (id: {})",
                    me.user.username.as_deref().unwrap_or("no username"),
                    me.user.id
                );
                return BotIdentity {
                    id: me.user.id.0.to_string(),
                    username: me.user.username.clone(),
                };
            }
            Err(e) => {
                let delay_secs = (INITIAL_DELAY_SECS * attempt).min(MAX_DELAY_SECS);
                warn!("Connection attempt {attempt} failed: {e}. Retrying in {delay_secs}s...");

                if attempt == 1 {
                    warn!("This may be due to:");
                    warn!("  - Network connectivity issues");
                    warn!("  - Firewall blocking api.telegram.org");
                    warn!("  - Invalid bot token");
                    warn!("  - Proxy or VPN configuration required");
                }

                sleep(Duration::from_secs(delay_secs)).await;
                attempt += 1;
            }
        }
    }
}

impl<P: LLMProvider + 'static> TelegramBot<P> {
    #[must_use]
    pub fn new(bot: Bot, orchestrator: Arc<TurnOrchestrator<P>>) -> Self {
        Self {
            sink: TelegramSink::new(bot.clone()),
            bot,
            orchestrator,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that stops in-flight turns when cancelled.
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Register the command menu and cancel in-flight turns on ctrl-c.
    async fn prepare(&self) {
        if let Err(e) = self.bot.set_my_commands(Command::bot_commands()).await {
            warn!("Failed to register command menu: {e}");
        }

        let on_ctrl_c = self.cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown requested, cancelling in-flight turns");
                on_ctrl_c.cancel();
            }
        });
    }

    fn schema(&self) -> UpdateHandler<Error> {
        let bot_clone = self.clone();
        dptree::entry().branch(Update::filter_message().endpoint(
            move |_bot: Bot, msg: Message| {
                let bot_clone = bot_clone.clone();
                async move { crate::handler::handle_message(bot_clone, msg).await }
            },
        ))
    }

    /// Long-poll until ctrl-c. In-flight turns are cancelled on shutdown.
    pub async fn run(self) -> Result<()> {
        self.prepare().await;

        info!("Telegram bot is polling for updates");
        Dispatcher::builder(self.bot.clone(), self.schema())
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;

        self.cancel.cancel();
        info!("Telegram bot stopped");
        Ok(())
    }

    /// Serve updates pushed by Telegram until ctrl-c.
    ///
    /// The webhook is registered on startup and deleted again once the
    /// server has shut down.
    pub async fn run_webhook(self, token: &str, settings: WebhookSettings) -> Result<()> {
        self.prepare().await;

        let url = settings.url(token)?;
        let mut options = Options::new(settings.bind_address(), url.clone());
        if let Some(secret) = settings.secret.clone() {
            options = options.secret_token(secret);
        }

        // Registers the webhook; `stop_flag` deletes it once the listener stops.
        let (listener, stop_flag, router) = webhooks::axum_to_router(self.bot.clone(), options).await?;

        let app = router
            .layer(middleware::from_fn_with_state(
                settings.secret.clone(),
                webhook::guard_update,
            ))
            .merge(
                Router::new()
                    .route("/", get(webhook::health))
                    .with_state(settings.port),
            );

        let tcp = TcpListener::bind(settings.bind_address()).await?;
        info!("Webhook set to {url}; listening on {}", settings.bind_address());
        let server = tokio::spawn(async move {
            axum::serve(tcp, app)
                .with_graceful_shutdown(stop_flag)
                .await
        });

        Dispatcher::builder(self.bot.clone(), self.schema())
            .enable_ctrlc_handler()
            .build()
            .dispatch_with_listener(
                listener,
                LoggingErrorHandler::with_custom_text("An error from the webhook listener"),
            )
            .await;

        self.cancel.cancel();
        match server.await {
            Ok(Ok(())) => info!("Webhook server stopped and webhook deleted"),
            Ok(Err(e)) => warn!("Webhook server failed: {e}"),
            Err(e) => warn!("Webhook server task ended abnormally: {e}"),
        }
        Ok(())
    }
}

impl<P> Clone for TelegramBot<P> {
    fn clone(&self) -> Self {
        Self {
            bot: self.bot.clone(),
            orchestrator: Arc::clone(&self.orchestrator),
            sink: self.sink.clone(),
            cancel: self.cancel.clone(),
        }
    }
}
