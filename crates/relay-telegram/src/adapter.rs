//! Telegram channel adapter.
//!
//! Polling mode drives a teloxide `Dispatcher` until the process exits.
//! Webhook mode only registers the URL here; updates then arrive through the
//! gateway's HTTP route and go through [`crate::dispatch_update`].

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::BotCommand;
use tracing::info;

use relay_agent::pipeline::commands::COMMANDS;
use relay_core::{translate, Locale};

use crate::context::TelegramAppContext;
use crate::error::TelegramError;
use crate::handler::{handle_callback_query, handle_message};

pub struct TelegramAdapter<C: TelegramAppContext + 'static> {
    ctx: Arc<C>,
    bot: Bot,
}

/// Command menu entries with descriptions in `locale`.
pub fn command_menu(locale: Locale) -> Vec<BotCommand> {
    COMMANDS
        .iter()
        .map(|(name, key)| BotCommand::new(*name, translate(*key, locale)))
        .collect()
}

impl<C: TelegramAppContext + 'static> TelegramAdapter<C> {
    pub fn new(bot: Bot, ctx: Arc<C>) -> Self {
        Self { ctx, bot }
    }

    /// Publish the command menu: once per locale, plus the default locale's
    /// menu for clients with any other language.
    pub async fn register_commands(&self, default: Locale) -> Result<(), TelegramError> {
        for locale in Locale::ALL {
            self.bot
                .set_my_commands(command_menu(locale))
                .language_code(locale.code())
                .await?;
        }
        self.bot.set_my_commands(command_menu(default)).await?;
        info!(locales = Locale::ALL.len(), "Telegram: command menu registered");
        Ok(())
    }

    /// Point Telegram at `url`. With a secret, Telegram echoes it back in the
    /// `X-Telegram-Bot-Api-Secret-Token` header of every update.
    pub async fn register_webhook(
        &self,
        url: &str,
        secret: Option<&str>,
    ) -> Result<(), TelegramError> {
        let parsed =
            reqwest::Url::parse(url).map_err(|e| TelegramError::WebhookUrl(format!("{url}: {e}")))?;
        let mut request = self.bot.set_webhook(parsed);
        if let Some(secret) = secret {
            request = request.secret_token(secret.to_string());
        }
        request.await?;
        info!(url, "Telegram: webhook registered");
        Ok(())
    }

    /// Drive the long-polling loop. Never returns.
    pub async fn run_polling(self) {
        info!("Telegram: starting long-polling dispatcher");

        let handler = dptree::entry()
            .branch(Update::filter_message().endpoint(handle_message::<C>))
            .branch(Update::filter_callback_query().endpoint(handle_callback_query::<C>));

        Dispatcher::builder(self.bot, handler)
            .dependencies(dptree::deps![self.ctx])
            .default_handler(|_upd| async {})
            .build()
            .dispatch()
            .await;
    }
}
