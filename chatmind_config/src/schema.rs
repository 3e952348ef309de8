use chatmind_core::{BudgetKeep, RecentWindow};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

const CONFIG_DIR: &str = "chatmind";
const CONFIG_FILE: &str = "config.json";

pub const BOT_TOKEN_ENV: &str = "BOT_TOKEN";
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const PUBLIC_URL_ENV: &str = "PUBLIC_URL";
pub const PORT_ENV: &str = "PORT";
pub const WEBHOOK_SECRET_ENV: &str = "WEBHOOK_SECRET";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub agents: AgentsConfig,
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub reply: ReplyConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default = "DatabaseConfig::default_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: Self::default_url(),
        }
    }
}

impl DatabaseConfig {
    /// `SQLite` file next to the config, created on first connect.
    fn default_url() -> String {
        dirs::home_dir().map_or_else(
            || "sqlite://memory.db?mode=rwc".to_string(),
            |home| {
                format!(
                    "sqlite://{}?mode=rwc",
                    home.join(CONFIG_DIR).join("memory.db").display()
                )
            },
        )
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MemoryConfig {
    #[serde(default = "MemoryConfig::default_recent_chars")]
    pub recent_chars: usize,
    #[serde(default = "MemoryConfig::default_summary_every")]
    pub summary_every_n_messages: u64,
    #[serde(default = "MemoryConfig::default_row_limit")]
    pub row_limit: usize,
    /// Keep the newest rows when the character budget cuts the window.
    #[serde(default)]
    pub keep_newest: bool,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            recent_chars: Self::default_recent_chars(),
            summary_every_n_messages: Self::default_summary_every(),
            row_limit: Self::default_row_limit(),
            keep_newest: false,
        }
    }
}

impl MemoryConfig {
    const fn default_recent_chars() -> usize {
        6000
    }

    const fn default_summary_every() -> u64 {
        80
    }

    const fn default_row_limit() -> usize {
        RecentWindow::DEFAULT_ROW_LIMIT
    }

    #[must_use]
    pub const fn keep(&self) -> BudgetKeep {
        if self.keep_newest {
            BudgetKeep::Newest
        } else {
            BudgetKeep::Oldest
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ReplyConfig {
    #[serde(default = "ReplyConfig::default_max_reply_chars")]
    pub max_reply_chars: usize,
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            max_reply_chars: Self::default_max_reply_chars(),
        }
    }
}

impl ReplyConfig {
    const fn default_max_reply_chars() -> usize {
        4096
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct TelegramConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default)]
    pub webhook: WebhookConfig,
}

/// Where Telegram pushes updates when the bot runs behind a public URL.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WebhookConfig {
    /// Externally reachable base URL, e.g. `https://bot.example.com`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,
    #[serde(default = "WebhookConfig::default_port")]
    pub port: u16,
    /// Expected `X-Telegram-Bot-Api-Secret-Token`; unset disables the check.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            public_url: None,
            port: Self::default_port(),
            secret: None,
        }
    }
}

impl WebhookConfig {
    const fn default_port() -> u16 {
        8000
    }

    /// The secret, if a non-blank one is configured.
    #[must_use]
    pub fn secret(&self) -> Option<&str> {
        self.secret.as_deref().filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AgentsConfig {
    pub defaults: AgentDefaults,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AgentDefaults {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub openai: OpenAIConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OpenAIConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Config {
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        Ok(dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot find home directory"))?
            .join(CONFIG_DIR))
    }

    /// Read `~/chatmind/config.json`, then let `BOT_TOKEN` and
    /// `OPENAI_API_KEY` override the secrets it holds.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_dir()?.join(CONFIG_FILE);

        if !config_path.exists() {
            anyhow::bail!(
                "Config file not found at: {}. Please run 'chatmind init' to create config.",
                config_path.display()
            );
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config = Self::from_json(&content)?
            .with_overrides(
                std::env::var(BOT_TOKEN_ENV).ok(),
                std::env::var(OPENAI_API_KEY_ENV).ok(),
            )
            .with_webhook_overrides(
                std::env::var(PUBLIC_URL_ENV).ok(),
                std::env::var(PORT_ENV).ok(),
                std::env::var(WEBHOOK_SECRET_ENV).ok(),
            )?;
        debug!("Loaded config from {}", config_path.display());

        Ok(config)
    }

    pub fn from_json(content: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Replace secrets with the given values; blank values are ignored.
    #[must_use]
    pub fn with_overrides(mut self, bot_token: Option<String>, api_key: Option<String>) -> Self {
        if let Some(token) = bot_token.filter(|t| !t.trim().is_empty()) {
            debug!("Telegram token taken from {BOT_TOKEN_ENV}");
            self.telegram.token = Some(token);
        }
        if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
            debug!("OpenAI API key taken from {OPENAI_API_KEY_ENV}");
            self.providers.openai.api_key = key;
        }
        self
    }

    /// Apply `PUBLIC_URL`, `PORT` and `WEBHOOK_SECRET`. Blank URL and port
    /// values are ignored; a set but empty secret turns the check off.
    pub fn with_webhook_overrides(
        mut self,
        public_url: Option<String>,
        port: Option<String>,
        secret: Option<String>,
    ) -> anyhow::Result<Self> {
        if let Some(url) = public_url.filter(|u| !u.trim().is_empty()) {
            debug!("Webhook URL taken from {PUBLIC_URL_ENV}");
            self.telegram.webhook.public_url = Some(url.trim().to_string());
        }
        if let Some(port) = port.filter(|p| !p.trim().is_empty()) {
            self.telegram.webhook.port = port
                .trim()
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid {PORT_ENV} value {port:?}: {e}"))?;
        }
        if let Some(secret) = secret {
            debug!("Webhook secret taken from {WEBHOOK_SECRET_ENV}");
            self.telegram.webhook.secret = Some(secret);
        }
        Ok(self)
    }

    /// The configured prompt, or `fallback` when none is set.
    #[must_use]
    pub fn system_prompt_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.agents
            .defaults
            .system_prompt
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(fallback)
    }

    pub fn ensure_config_dir() -> anyhow::Result<PathBuf> {
        let config_dir = Self::config_dir()?;
        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }

    pub fn create_config() -> anyhow::Result<PathBuf> {
        let config_dir = Self::ensure_config_dir()?;
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            anyhow::bail!(
                "Config file already exists at: {}. Please edit it directly.",
                config_path.display()
            );
        }

        std::fs::write(&config_path, Self::template())?;
        Ok(config_path)
    }

    #[must_use]
    pub fn template() -> String {
        format!(
            r#"{{
  "agents": {{
    "defaults": {{
      "model": "gpt-4.1-mini",
      "system_prompt": "You are a helpful assistant in a group chat. Use the chat memory to stay consistent with what people said earlier. Answer clearly and concisely."
    }}
  }},
  "providers": {{
    "openai": {{
      "api_key": "your-openai-api-key-here",
      "base_url": "https://api.openai.com/v1"
    }}
  }},
  "database": {{
    "url": "{}"
  }},
  "memory": {{
    "recent_chars": 6000,
    "summary_every_n_messages": 80,
    "row_limit": 300,
    "keep_newest": false
  }},
  "reply": {{
    "max_reply_chars": 4096
  }},
  "telegram": {{
    "enabled": true,
    "token": "your-telegram-bot-token-here",
    "webhook": {{
      "port": 8000
    }}
  }}
}}"#,
            DatabaseConfig::default_url().replace('\\', "\\\\")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "agents": { "defaults": { "model": "gpt-4o-mini" } },
        "providers": { "openai": { "api_key": "from-file" } }
    }"#;

    #[test]
    fn minimal_config_fills_defaults() {
        let config = Config::from_json(MINIMAL).unwrap();
        assert_eq!(config.agents.defaults.model, "gpt-4o-mini");
        assert_eq!(config.memory.recent_chars, 6000);
        assert_eq!(config.memory.summary_every_n_messages, 80);
        assert_eq!(config.memory.row_limit, 300);
        assert_eq!(config.memory.keep(), BudgetKeep::Oldest);
        assert_eq!(config.reply.max_reply_chars, 4096);
        assert!(!config.telegram.enabled);
        assert!(config.telegram.token.is_none());
        assert!(config.database.url.starts_with("sqlite://"));
        assert_eq!(config.telegram.webhook.port, 8000);
        assert!(config.telegram.webhook.public_url.is_none());
        assert!(config.telegram.webhook.secret().is_none());
    }

    #[test]
    fn template_parses() {
        let config = Config::from_json(&Config::template()).unwrap();
        assert_eq!(config.agents.defaults.model, "gpt-4.1-mini");
        assert!(config.telegram.enabled);
        assert_eq!(
            config.providers.openai.base_url.as_deref(),
            Some("https://api.openai.com/v1")
        );
    }

    #[test]
    fn env_values_override_file_secrets() {
        let config = Config::from_json(MINIMAL)
            .unwrap()
            .with_overrides(Some("123:abc".to_string()), Some("from-env".to_string()));
        assert_eq!(config.telegram.token.as_deref(), Some("123:abc"));
        assert_eq!(config.providers.openai.api_key, "from-env");
    }

    #[test]
    fn blank_overrides_are_ignored() {
        let config = Config::from_json(MINIMAL)
            .unwrap()
            .with_overrides(Some("  ".to_string()), None);
        assert!(config.telegram.token.is_none());
        assert_eq!(config.providers.openai.api_key, "from-file");
    }

    #[test]
    fn keep_newest_flag_selects_window_order() {
        let config = Config::from_json(
            r#"{
            "agents": { "defaults": { "model": "m", "system_prompt": "  " } },
            "providers": { "openai": {} },
            "memory": { "keep_newest": true, "recent_chars": 100 }
        }"#,
        )
        .unwrap();
        assert_eq!(config.memory.keep(), BudgetKeep::Newest);
        assert_eq!(config.memory.recent_chars, 100);
        assert_eq!(config.system_prompt_or("fallback"), "fallback");
    }

    #[test]
    fn webhook_env_overrides_file_values() {
        let config = Config::from_json(
            r#"{
            "agents": { "defaults": { "model": "m" } },
            "providers": { "openai": {} },
            "telegram": { "webhook": { "port": 9000, "secret": "file" } }
        }"#,
        )
        .unwrap()
        .with_webhook_overrides(
            Some(" https://bot.example.com ".to_string()),
            Some("8443".to_string()),
            Some("env-secret".to_string()),
        )
        .unwrap();
        let webhook = &config.telegram.webhook;
        assert_eq!(webhook.public_url.as_deref(), Some("https://bot.example.com"));
        assert_eq!(webhook.port, 8443);
        assert_eq!(webhook.secret(), Some("env-secret"));
    }

    #[test]
    fn empty_webhook_secret_disables_the_check() {
        let config = Config::from_json(MINIMAL)
            .unwrap()
            .with_webhook_overrides(None, Some(String::new()), Some(String::new()))
            .unwrap();
        assert_eq!(config.telegram.webhook.port, 8000);
        assert!(config.telegram.webhook.secret().is_none());
    }

    #[test]
    fn malformed_port_is_rejected() {
        let result = Config::from_json(MINIMAL)
            .unwrap()
            .with_webhook_overrides(None, Some("eighty".to_string()), None);
        assert!(result.is_err());
    }
}
