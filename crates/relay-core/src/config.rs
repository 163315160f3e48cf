use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::catalog::ModelCatalog;
use crate::error::{RelayError, Result};
use crate::i18n::Locale;

pub const DEFAULT_PORT: u16 = 8787;
pub const DEFAULT_BIND: &str = "127.0.0.1";
/// Telegram's per-message limit.
pub const MAX_MESSAGE_CHARS: usize = 4096;
pub const DEFAULT_GROUP_COOLDOWN_MS: u64 = 180_000;
pub const DEFAULT_MAX_CONTEXT_CHARS: usize = 8_000;
pub const CONTEXT_TTL_SECS: u64 = 60 * 60 * 24 * 30;
pub const PREFERENCE_TTL_SECS: u64 = 60 * 60 * 24 * 365;

/// Top-level config (relay.toml + RELAY_* env overrides).
///
/// Every section defaults so a partial file still extracts; required
/// credentials are checked separately by [`RelayConfig::validate`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub access: AccessConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub locale: LocaleConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    /// Username the bot answers to in groups (`@{bot_name}`), without the `@`.
    #[serde(default = "default_bot_name")]
    pub bot_name: String,
    /// Public HTTPS URL registered with `setWebhook` on startup. Optional.
    pub webhook_url: Option<String>,
    /// Expected `X-Telegram-Bot-Api-Secret-Token` header value. Optional.
    pub webhook_secret: Option<String>,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            bot_name: default_bot_name(),
            webhook_url: None,
            webhook_secret: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Sender identities exempt from cooldown and private-chat authorization.
    #[serde(default)]
    pub whitelist: Vec<String>,
    /// Minimum spacing between admitted non-whitelisted requests in one group.
    /// Zero disables the cooldown.
    #[serde(default = "default_group_cooldown_ms")]
    pub group_cooldown_ms: u64,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            whitelist: Vec::new(),
            group_cooldown_ms: DEFAULT_GROUP_COOLDOWN_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    #[serde(default = "default_system_role")]
    pub system_role: String,
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
    /// Extra attempts after the first when the backend reports overload.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            system_role: default_system_role(),
            max_context_chars: default_max_context_chars(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
        }
    }
}

/// OpenAI-compatible completion backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_provider_base_url")]
    pub base_url: String,
    /// Ordered model catalog. The first entry is the default model.
    #[serde(default)]
    pub models: Vec<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_provider_base_url(),
            models: Vec::new(),
        }
    }
}

impl ProviderConfig {
    pub fn catalog(&self) -> ModelCatalog {
        ModelCatalog::new(self.models.iter().cloned())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Memory,
    Upstash,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default = "default_db_path")]
    pub path: String,
    pub upstash_url: Option<String>,
    pub upstash_token: Option<String>,
    #[serde(default = "default_context_ttl_secs")]
    pub context_ttl_secs: u64,
    #[serde(default = "default_preference_ttl_secs")]
    pub preference_ttl_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_db_path(),
            upstash_url: None,
            upstash_token: None,
            context_ttl_secs: default_context_ttl_secs(),
            preference_ttl_secs: default_preference_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LocaleConfig {
    #[serde(default)]
    pub default: Locale,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    #[default]
    Webhook,
    Polling,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default)]
    pub mode: DeliveryMode,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
            mode: DeliveryMode::default(),
        }
    }
}

fn default_bot_name() -> String {
    "bot".to_string()
}
fn default_group_cooldown_ms() -> u64 {
    DEFAULT_GROUP_COOLDOWN_MS
}
fn default_system_prompt() -> String {
    "You are a helpful assistant.".to_string()
}
fn default_system_role() -> String {
    "system".to_string()
}
fn default_max_context_chars() -> usize {
    DEFAULT_MAX_CONTEXT_CHARS
}
fn default_max_retries() -> u32 {
    3
}
fn default_initial_backoff_ms() -> u64 {
    1000
}
fn default_provider_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta/openai".to_string()
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.relay/relay.db", home)
}
fn default_context_ttl_secs() -> u64 {
    CONTEXT_TTL_SECS
}
fn default_preference_ttl_secs() -> u64 {
    PREFERENCE_TTL_SECS
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

impl RelayConfig {
    /// Load config from a TOML file with RELAY_* env var overrides.
    ///
    /// Path resolution: explicit argument, then `~/.relay/relay.toml`.
    /// Nested keys use a double underscore, e.g. `RELAY_PROVIDER__API_KEY`.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: RelayConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("RELAY_").split("__"))
            .extract()
            .map_err(|e| RelayError::Config(e.to_string()))?;

        Ok(config)
    }

    /// Reject configurations the bot cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.trim().is_empty() {
            return Err(RelayError::Config("telegram.bot_token is not set".into()));
        }
        if self.provider.api_key.trim().is_empty() {
            return Err(RelayError::Config("provider.api_key is not set".into()));
        }
        if self.provider.catalog().is_empty() {
            return Err(RelayError::Config(
                "provider.models must list at least one model".into(),
            ));
        }
        if self.store.backend == StoreBackend::Upstash
            && (self.store.upstash_url.is_none() || self.store.upstash_token.is_none())
        {
            return Err(RelayError::Config(
                "store.backend = \"upstash\" requires store.upstash_url and store.upstash_token"
                    .into(),
            ));
        }
        Ok(())
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.relay/relay.toml", home)
}
