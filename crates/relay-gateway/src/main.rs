use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use teloxide::Bot;
use tracing::{info, warn};

use relay_agent::format::sanitize_for_storage;
use relay_agent::prompt::load_system_message;
use relay_agent::{AdmissionControl, CatalogRouter, CatalogSlot, CompletionClient, OpenAiCompatClient};
use relay_core::config::{DeliveryMode, StoreBackend};
use relay_core::RelayConfig;
use relay_store::{ContextStore, CooldownRecords, KvStore, MemoryKv, PreferenceDefaults, SqliteKv, UpstashKv};
use relay_telegram::{TelegramAdapter, TelegramTransport};

mod app;
mod http;

const PURGE_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Webhook,
    Polling,
}

impl From<Mode> for DeliveryMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Webhook => DeliveryMode::Webhook,
            Mode::Polling => DeliveryMode::Polling,
        }
    }
}

/// Telegram relay in front of an OpenAI-compatible completion backend.
#[derive(Debug, Parser)]
#[command(name = "relay-gateway", version)]
struct Args {
    /// Config file (default: $RELAY_CONFIG, then ~/.relay/relay.toml).
    #[arg(long)]
    config: Option<String>,

    /// Override `gateway.mode`.
    #[arg(long, value_enum)]
    mode: Option<Mode>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "relay_gateway=info,relay_agent=info,relay_telegram=info,tower_http=info".into()
            }),
        )
        .init();

    let args = Args::parse();

    // load config: --config > RELAY_CONFIG env > ~/.relay/relay.toml
    let config_path = args.config.or_else(|| std::env::var("RELAY_CONFIG").ok());
    let mut config = RelayConfig::load(config_path.as_deref())?;
    if let Some(mode) = args.mode {
        config.gateway.mode = mode.into();
    }
    config.validate()?;

    let kv = build_kv(&config)?;
    info!(backend = kv.name(), "key-value store ready");

    let store = ContextStore::new(
        kv.clone(),
        PreferenceDefaults {
            locale: config.locale.default,
            catalog: config.provider.catalog(),
        },
    )
    .with_sanitizer(sanitize_for_storage)
    .with_max_context_chars(config.agent.max_context_chars)
    .with_ttls(
        Duration::from_secs(config.store.context_ttl_secs),
        Duration::from_secs(config.store.preference_ttl_secs),
    );

    let admission = AdmissionControl::new(
        config.access.whitelist.clone(),
        Duration::from_millis(config.access.group_cooldown_ms),
        CooldownRecords::new(kv.clone()),
    );

    let completion = build_completion(&config);
    let system_message = load_system_message(kv.as_ref(), &config.agent).await;

    let bot = Bot::new(&config.telegram.bot_token);
    let state = Arc::new(app::AppState {
        transport: Box::new(TelegramTransport::new(bot.clone())),
        config,
        kv,
        store,
        admission,
        completion,
        system_message,
    });

    let adapter = TelegramAdapter::new(bot, Arc::clone(&state));
    if let Err(e) = adapter.register_commands(state.config.locale.default).await {
        warn!(error = %e, "command menu registration failed");
    }

    match state.config.gateway.mode {
        DeliveryMode::Webhook => match state.config.telegram.webhook_url.as_deref() {
            Some(url) => {
                adapter
                    .register_webhook(url, state.config.telegram.webhook_secret.as_deref())
                    .await?;
            }
            None => info!("no telegram.webhook_url configured, expecting an existing registration"),
        },
        DeliveryMode::Polling => {
            tokio::spawn(adapter.run_polling());
            info!("Telegram polling started");
        }
    }

    let addr: SocketAddr = format!("{}:{}", state.config.gateway.bind, state.config.gateway.port).parse()?;
    let router = app::build_router(state);
    info!("relay gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

/// Open the configured key-value backend. SQLite also gets a background task
/// that drops expired rows.
fn build_kv(config: &RelayConfig) -> anyhow::Result<Arc<dyn KvStore>> {
    let store = &config.store;
    let kv: Arc<dyn KvStore> = match store.backend {
        StoreBackend::Sqlite => {
            ensure_parent_dir(&store.path);
            info!(path = %store.path, "opening SQLite store");
            let sqlite = Arc::new(SqliteKv::open(&store.path)?);
            spawn_purge(Arc::clone(&sqlite));
            sqlite
        }
        StoreBackend::Memory => {
            warn!("in-memory store: conversations are lost on restart");
            Arc::new(MemoryKv::new())
        }
        StoreBackend::Upstash => {
            let url = store.upstash_url.clone().unwrap_or_default();
            let token = store.upstash_token.clone().unwrap_or_default();
            Arc::new(UpstashKv::new(url, token))
        }
    };
    Ok(kv)
}

fn spawn_purge(sqlite: Arc<SqliteKv>) {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(PURGE_INTERVAL);
        loop {
            tick.tick().await;
            match sqlite.purge_expired() {
                Ok(0) => {}
                Ok(n) => info!(rows = n, "purged expired keys"),
                Err(e) => warn!(error = %e, "purging expired keys failed"),
            }
        }
    });
}

/// Build the completion backend. Every request goes through a
/// [`CatalogRouter`] so unknown models are rejected before any HTTP call.
fn build_completion(config: &RelayConfig) -> Box<dyn CompletionClient> {
    let catalog = config.provider.catalog();
    info!(
        base_url = %config.provider.base_url,
        models = ?catalog.models(),
        "completion backend: OpenAI-compatible"
    );
    let client = OpenAiCompatClient::new(
        config.provider.api_key.clone(),
        config.provider.base_url.clone(),
        catalog.clone(),
    );
    Box::new(CatalogRouter::new(vec![CatalogSlot::new(
        catalog,
        Box::new(client),
    )]))
}

/// Ensure the parent directory for a file path exists.
fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}
