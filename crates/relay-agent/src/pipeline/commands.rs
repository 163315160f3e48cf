//! Slash commands, intercepted before the turn pipeline.
//!
//! `/start`, `/language`, `/switchmodel`, `/new`, `/history`, `/help`.
//! Replies go to the chat the command came from; state changes apply to
//! the sender.

use relay_core::{translate, InboundMessage, Key, Locale};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::prompt::summary_prompt;

use super::context::PipelineContext;
use super::retry::{generate_with_retry, RetryPolicy};
use super::transport::{Keyboard, KeyboardButton, SendOptions};
use super::turn::{deliver, load_preference};

/// Command names with their menu descriptions, in menu order.
pub const COMMANDS: &[(&str, Key)] = &[
    ("start", Key::StartDescription),
    ("language", Key::LanguageDescription),
    ("switchmodel", Key::SwitchModelDescription),
    ("new", Key::NewDescription),
    ("history", Key::HistoryDescription),
    ("help", Key::HelpDescription),
];

pub const LANGUAGE_CALLBACK_PREFIX: &str = "lang_";
pub const MODEL_CALLBACK_PREFIX: &str = "model_";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// Lowercased, without the leading `/` or any `@bot` suffix.
    pub name: String,
    pub args: Vec<String>,
}

/// Parse `/name@bot arg1 arg2`. Returns `None` for anything that is not a command.
pub fn parse_command(text: &str) -> Option<ParsedCommand> {
    let rest = text.trim_start().strip_prefix('/')?;
    let mut parts = rest.split_whitespace();
    let head = parts.next()?;
    let name = head.split('@').next().unwrap_or(head).to_ascii_lowercase();
    if name.is_empty() {
        return None;
    }
    Some(ParsedCommand {
        name,
        args: parts.map(String::from).collect(),
    })
}

/// Localized help text: intro line, then `/name - description` per command.
pub fn help_text(locale: Locale) -> String {
    let mut out = translate(Key::HelpIntro, locale).to_string();
    for (name, key) in COMMANDS {
        out.push_str(&format!("\n/{name} - {}", translate(*key, locale)));
    }
    out
}

pub fn language_keyboard() -> Keyboard {
    vec![Locale::ALL
        .iter()
        .map(|l| KeyboardButton::new(l.label(), format!("{LANGUAGE_CALLBACK_PREFIX}{}", l.code())))
        .collect()]
}

/// One model per row, in catalog order.
pub fn model_keyboard(models: &[String]) -> Keyboard {
    models
        .iter()
        .map(|m| vec![KeyboardButton::new(m.clone(), format!("{MODEL_CALLBACK_PREFIX}{m}"))])
        .collect()
}

fn reply_options(msg: &InboundMessage) -> SendOptions {
    if msg.chat_kind.is_shared() {
        SendOptions::plain().reply_to(msg.message_id)
    } else {
        SendOptions::plain()
    }
}

async fn reply<C: PipelineContext + ?Sized>(ctx: &C, msg: &InboundMessage, text: &str, opts: SendOptions) {
    if let Err(e) = ctx.transport().send(msg.chat_id, text, &opts).await {
        warn!(chat_id = msg.chat_id, error = %e, "command reply not delivered");
    }
}

/// Run one parsed command. Never fails; problems are logged and reported
/// to the user as the generic error notice.
pub async fn execute_command<C: PipelineContext + ?Sized>(
    ctx: &C,
    msg: &InboundMessage,
    command: &ParsedCommand,
) {
    let user = msg.sender_id.as_str();
    let pref = load_preference(ctx, user).await;
    let locale = pref.language;
    info!(chat_id = msg.chat_id, user, command = %command.name, "command");

    match command.name.as_str() {
        "start" => {
            let text = format!(
                "{}\n{}{}\n{}",
                translate(Key::Welcome, locale),
                translate(Key::CurrentModel, locale),
                pref.active_model,
                translate(Key::GroupUsageHint, locale)
            );
            reply(ctx, msg, &text, reply_options(msg)).await;
        }
        "language" => {
            let opts = reply_options(msg).with_keyboard(language_keyboard());
            reply(ctx, msg, translate(Key::ChooseLanguage, locale), opts).await;
        }
        "switchmodel" => {
            let models = ctx.completion().list_models();
            let opts = reply_options(msg).with_keyboard(model_keyboard(&models));
            reply(ctx, msg, translate(Key::ChooseModel, locale), opts).await;
        }
        "new" => {
            let text = match ctx.store().clear_context(user).await {
                Ok(()) => translate(Key::NewConversation, locale),
                Err(e) => {
                    error!(user, error = %e, "clearing context failed");
                    translate(Key::Error, locale)
                }
            };
            reply(ctx, msg, text, reply_options(msg)).await;
        }
        "history" => summarize_history(ctx, msg, &pref.active_model, locale).await,
        "help" => reply(ctx, msg, &help_text(locale), reply_options(msg)).await,
        _ => reply(ctx, msg, translate(Key::CommandNotFound, locale), reply_options(msg)).await,
    }
}

async fn summarize_history<C: PipelineContext + ?Sized>(
    ctx: &C,
    msg: &InboundMessage,
    model: &str,
    locale: Locale,
) {
    let user = msg.sender_id.as_str();
    let context = match ctx.store().get_context(user).await {
        Ok(Some(context)) => context,
        Ok(None) => {
            reply(ctx, msg, translate(Key::NoHistory, locale), reply_options(msg)).await;
            return;
        }
        Err(e) => {
            error!(user, error = %e, "context read failed");
            reply(ctx, msg, translate(Key::Error, locale), reply_options(msg)).await;
            return;
        }
    };

    let prompt = summary_prompt(&context, locale.english_name());
    let policy = RetryPolicy::from_config(&ctx.config().agent);
    match generate_with_retry(ctx.completion(), &prompt, model, policy).await {
        Ok(summary) => {
            let text = format!("{}\n\n{summary}", translate(Key::HistorySummary, locale));
            deliver(ctx, msg, &text, Uuid::new_v4()).await;
        }
        Err(e) => {
            error!(user, model, error = %e, "history summary failed");
            reply(ctx, msg, translate(Key::Error, locale), reply_options(msg)).await;
        }
    }
}
