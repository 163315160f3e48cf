//! Routing for inbound updates: mention gate, command interception, media
//! rejection, then the turn pipeline.

use relay_core::{translate, CallbackAction, InboundMessage, Key, Locale};
use tracing::{debug, info, warn};

use super::commands::{execute_command, parse_command, LANGUAGE_CALLBACK_PREFIX, MODEL_CALLBACK_PREFIX};
use super::context::PipelineContext;
use super::transport::SendOptions;
use super::turn::{load_preference, run_turn, TurnOutcome};

/// What happened to an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed {
    Ignored,
    Command,
    Unsupported,
    Turn(TurnOutcome),
}

fn is_username_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Byte ranges of `@bot_name` mentions (case-insensitive, whole username).
fn mention_ranges(text: &str, bot_name: &str) -> Vec<(usize, usize)> {
    if bot_name.is_empty() {
        return Vec::new();
    }
    let needle = format!("@{}", bot_name.to_ascii_lowercase());
    let haystack = text.to_ascii_lowercase();
    let mut out = Vec::new();
    let mut from = 0;
    while let Some(pos) = haystack[from..].find(&needle) {
        let start = from + pos;
        let end = start + needle.len();
        if !haystack[end..].starts_with(is_username_char) {
            out.push((start, end));
        }
        from = end;
    }
    out
}

pub fn contains_mention(text: &str, bot_name: &str) -> bool {
    !mention_ranges(text, bot_name).is_empty()
}

/// Remove every `@bot_name` mention and trim.
pub fn strip_mention(text: &str, bot_name: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for (start, end) in mention_ranges(text, bot_name) {
        out.push_str(&text[last..start]);
        last = end;
    }
    out.push_str(&text[last..]);
    out.trim().to_string()
}

/// Route one inbound message.
///
/// Shared chats: only messages mentioning the bot are considered, with the
/// mention removed. Private chats: only whitelisted senders are answered.
/// Commands run for whitelisted senders only.
pub async fn handle_inbound<C: PipelineContext + ?Sized>(ctx: &C, mut msg: InboundMessage) -> Routed {
    let whitelisted = ctx.admission().is_whitelisted(&msg.sender_id);

    if msg.chat_kind.is_shared() {
        let bot_name = ctx.config().telegram.bot_name.as_str();
        if !contains_mention(&msg.text, bot_name) {
            return Routed::Ignored;
        }
        msg.text = strip_mention(&msg.text, bot_name);
    } else if !whitelisted {
        debug!(chat_id = msg.chat_id, user = %msg.sender_id, "ignoring private message from non-whitelisted sender");
        return Routed::Ignored;
    }

    if let Some(command) = parse_command(&msg.text) {
        if !whitelisted {
            debug!(chat_id = msg.chat_id, user = %msg.sender_id, "ignoring command from non-whitelisted sender");
            return Routed::Ignored;
        }
        execute_command(ctx, &msg, &command).await;
        return Routed::Command;
    }

    if msg.has_media {
        let pref = load_preference(ctx, &msg.sender_id).await;
        let opts = SendOptions::plain().reply_to(msg.message_id);
        let notice = translate(Key::UnsupportedMessage, pref.language);
        if let Err(e) = ctx.transport().send(msg.chat_id, notice, &opts).await {
            warn!(chat_id = msg.chat_id, error = %e, "unsupported notice not delivered");
        }
        return Routed::Unsupported;
    }

    if msg.text.trim().is_empty() {
        return Routed::Ignored;
    }

    Routed::Turn(run_turn(ctx, &msg).await)
}

/// Handle an inline-keyboard selection. The callback is always answered.
pub async fn handle_callback<C: PipelineContext + ?Sized>(ctx: &C, action: CallbackAction) {
    let user = action.sender_id.as_str();

    if ctx.admission().is_whitelisted(user) {
        if let Some(code) = action.data.strip_prefix(LANGUAGE_CALLBACK_PREFIX) {
            select_language(ctx, &action, code).await;
        } else if let Some(model) = action.data.strip_prefix(MODEL_CALLBACK_PREFIX) {
            select_model(ctx, &action, model).await;
        } else {
            debug!(data = %action.data, "unrecognised callback data");
        }
    } else {
        debug!(user, "ignoring callback from non-whitelisted sender");
    }

    if let Err(e) = ctx.transport().answer_callback(&action.callback_id, None).await {
        warn!(error = %e, "callback not answered");
    }
}

async fn notify<C: PipelineContext + ?Sized>(ctx: &C, chat_id: i64, text: &str) {
    if let Err(e) = ctx.transport().send(chat_id, text, &SendOptions::plain()).await {
        warn!(chat_id, error = %e, "callback confirmation not delivered");
    }
}

async fn select_language<C: PipelineContext + ?Sized>(ctx: &C, action: &CallbackAction, code: &str) {
    let Some(locale) = Locale::parse(code) else {
        debug!(code, "unknown language selection");
        return;
    };
    let text = match ctx.store().set_language(&action.sender_id, locale).await {
        Ok(()) => {
            info!(user = %action.sender_id, language = locale.code(), "language changed");
            format!("{}{}", translate(Key::LanguageChanged, locale), locale.label())
        }
        Err(e) => {
            warn!(user = %action.sender_id, error = %e, "language write failed");
            translate(Key::Error, locale).to_string()
        }
    };
    notify(ctx, action.chat_id, &text).await;
}

/// Switching models starts a fresh conversation.
async fn select_model<C: PipelineContext + ?Sized>(ctx: &C, action: &CallbackAction, model: &str) {
    let locale = load_preference(ctx, &action.sender_id).await.language;
    if !ctx.completion().is_valid_model(model) {
        notify(ctx, action.chat_id, &format!("{}{model}", translate(Key::UnknownModel, locale))).await;
        return;
    }

    let store = ctx.store();
    let result = match store.clear_context(&action.sender_id).await {
        Ok(()) => store.set_model(&action.sender_id, model).await,
        Err(e) => Err(e),
    };
    let text = match result {
        Ok(()) => {
            info!(user = %action.sender_id, model, "model changed");
            format!("{}{model}", translate(Key::ModelChanged, locale))
        }
        Err(e) => {
            warn!(user = %action.sender_id, error = %e, "model switch failed");
            translate(Key::Error, locale).to_string()
        }
    };
    notify(ctx, action.chat_id, &text).await;
}
