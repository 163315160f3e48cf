//! Update handlers: convert teloxide types into pipeline values and spawn
//! the pipeline so the dispatcher (or webhook request) returns immediately.

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::{Update, UpdateKind};
use tracing::debug;

use relay_agent::pipeline::{handle_callback, handle_inbound};
use relay_core::{CallbackAction, ChatKind, InboundMessage};

use crate::context::TelegramAppContext;

fn chat_kind(msg: &Message) -> Option<ChatKind> {
    if msg.chat.is_private() {
        Some(ChatKind::Private)
    } else if msg.chat.is_supergroup() {
        Some(ChatKind::Supergroup)
    } else if msg.chat.is_group() {
        Some(ChatKind::Group)
    } else {
        None
    }
}

fn has_media(msg: &Message) -> bool {
    msg.photo().is_some()
        || msg.document().is_some()
        || msg.video().is_some()
        || msg.video_note().is_some()
        || msg.animation().is_some()
        || msg.audio().is_some()
        || msg.voice().is_some()
        || msg.sticker().is_some()
}

/// `None` for channel posts, anonymous senders and other bots.
pub fn inbound_from_message(msg: &Message) -> Option<InboundMessage> {
    let from = msg.from.as_ref().filter(|u| !u.is_bot)?;
    let chat_kind = chat_kind(msg)?;
    Some(InboundMessage {
        chat_id: msg.chat.id.0,
        chat_kind,
        sender_id: from.id.0.to_string(),
        message_id: msg.id.0,
        text: msg.text().or(msg.caption()).unwrap_or("").to_string(),
        has_media: has_media(msg),
    })
}

/// Callbacks without data are dropped. The reply goes to the chat holding the
/// keyboard, or to the sender's private chat when that message is gone.
pub fn callback_from_query(query: &CallbackQuery) -> Option<CallbackAction> {
    let data = query.data.clone()?;
    let chat_id = query
        .message
        .as_ref()
        .map(|m| m.chat().id.0)
        .unwrap_or(query.from.id.0 as i64);
    Some(CallbackAction {
        callback_id: query.id.to_string(),
        chat_id,
        sender_id: query.from.id.0.to_string(),
        data,
    })
}

fn spawn_inbound<C: TelegramAppContext + 'static>(ctx: Arc<C>, msg: &Message) {
    let Some(inbound) = inbound_from_message(msg) else {
        return;
    };
    tokio::spawn(async move {
        let chat_id = inbound.chat_id;
        let routed = handle_inbound(ctx.as_ref(), inbound).await;
        debug!(chat_id, ?routed, "message handled");
    });
}

fn spawn_callback<C: TelegramAppContext + 'static>(ctx: Arc<C>, query: &CallbackQuery) {
    let Some(action) = callback_from_query(query) else {
        return;
    };
    tokio::spawn(async move {
        handle_callback(ctx.as_ref(), action).await;
    });
}

/// Dispatcher endpoint for messages (polling mode).
pub async fn handle_message<C: TelegramAppContext + 'static>(
    msg: Message,
    ctx: Arc<C>,
) -> ResponseResult<()> {
    spawn_inbound(ctx, &msg);
    Ok(())
}

/// Dispatcher endpoint for inline-keyboard presses (polling mode).
pub async fn handle_callback_query<C: TelegramAppContext + 'static>(
    query: CallbackQuery,
    ctx: Arc<C>,
) -> ResponseResult<()> {
    spawn_callback(ctx, &query);
    Ok(())
}

/// Entry point for webhook mode: route one raw update.
pub fn dispatch_update<C: TelegramAppContext + 'static>(ctx: Arc<C>, update: Update) {
    match &update.kind {
        UpdateKind::Message(msg) => spawn_inbound(ctx, msg),
        UpdateKind::CallbackQuery(query) => spawn_callback(ctx, query),
        _ => debug!(update_id = update.id.0, "ignoring unsupported update kind"),
    }
}
