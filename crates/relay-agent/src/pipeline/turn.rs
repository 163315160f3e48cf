//! One conversation turn: admit, load context, generate, format, deliver,
//! persist.
//!
//! `run_turn` never returns an error. Every path ends in exactly one
//! [`TurnOutcome`]; failures are logged and, where the user should know,
//! answered with a localized notice.

use relay_core::config::MAX_MESSAGE_CHARS;
use relay_core::{translate, InboundMessage, Key, Locale};
use relay_store::Preference;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::admission::{Admission, DenyReason};
use crate::format::{split_for_delivery, to_plain_text, to_rich_markup};
use crate::prompt::assemble_prompt;

use super::context::PipelineContext;
use super::retry::{generate_with_retry, RetryPolicy};
use super::transport::{DeliveryError, SendOptions};

/// Progress of a turn. The last three are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Admitting,
    ContextLoaded,
    Generating,
    Formatting,
    Delivered,
    Denied,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnFailure {
    /// Backend error or retries exhausted; nothing was persisted.
    Generation,
    /// Rich and plain delivery both failed; the turn was still persisted.
    Delivery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    Delivered,
    Denied(DenyReason),
    Failed(TurnFailure),
}

impl TurnOutcome {
    pub fn state(&self) -> TurnState {
        match self {
            TurnOutcome::Delivered => TurnState::Delivered,
            TurnOutcome::Denied(_) => TurnState::Denied,
            TurnOutcome::Failed(_) => TurnState::Failed,
        }
    }
}

/// Effective preference, falling back to defaults when the store is unreadable.
pub(crate) async fn load_preference<C: PipelineContext + ?Sized>(ctx: &C, user_id: &str) -> Preference {
    match ctx.store().get_preference(user_id).await {
        Ok(pref) => pref,
        Err(e) => {
            warn!(user = user_id, error = %e, "preference read failed, using defaults");
            let defaults = ctx.store().defaults();
            Preference {
                language: defaults.locale,
                active_model: defaults.catalog.default_model().unwrap_or_default().to_string(),
            }
        }
    }
}

/// Cooldown notice, e.g. "Cooling down. Please wait 42 seconds before asking again."
pub fn cooldown_notice(wait_ms: u64, locale: Locale) -> String {
    format!(
        "{} {} {}",
        translate(Key::GroupCooldown, locale),
        wait_ms.div_ceil(1000),
        translate(Key::Seconds, locale)
    )
}

/// Reply as delivered to the user, before rendering.
pub fn compose_reply(model: &str, answer: &str, locale: Locale) -> String {
    format!("🤖 {model}\n{answer}{}", translate(Key::Disclaimer, locale))
}

/// Run a full turn for an already-routed text message.
pub async fn run_turn<C: PipelineContext + ?Sized>(ctx: &C, msg: &InboundMessage) -> TurnOutcome {
    let turn_id = Uuid::new_v4();
    let user = msg.sender_id.as_str();
    debug!(turn = %turn_id, chat_id = msg.chat_id, user, state = ?TurnState::Admitting, "turn started");

    let admission = ctx
        .admission()
        .is_admitted(user, msg.chat_kind, msg.chat_id)
        .await;
    if let Admission::Denied(reason) = admission {
        info!(turn = %turn_id, chat_id = msg.chat_id, user, ?reason, "turn denied");
        if let DenyReason::Cooldown { wait_ms } = reason {
            let pref = load_preference(ctx, user).await;
            let notice = cooldown_notice(wait_ms, pref.language);
            let opts = SendOptions::plain().reply_to(msg.message_id);
            if let Err(e) = ctx.transport().send(msg.chat_id, &notice, &opts).await {
                warn!(turn = %turn_id, error = %e, "cooldown notice not delivered");
            }
        }
        return TurnOutcome::Denied(reason);
    }

    let pref = load_preference(ctx, user).await;
    let context = match ctx.store().get_context(user).await {
        Ok(context) => context,
        Err(e) => {
            warn!(turn = %turn_id, user, error = %e, "context read failed, continuing without");
            None
        }
    };
    let prompt = assemble_prompt(ctx.system_message(), context.as_deref(), &msg.text);
    debug!(
        turn = %turn_id,
        state = ?TurnState::ContextLoaded,
        entries = prompt.len(),
        model = %pref.active_model,
        "prompt assembled"
    );

    if let Err(e) = ctx.transport().send_typing(msg.chat_id).await {
        debug!(turn = %turn_id, error = %e, "typing indicator failed");
    }

    debug!(turn = %turn_id, state = ?TurnState::Generating, "calling completion backend");
    let policy = RetryPolicy::from_config(&ctx.config().agent);
    let answer =
        match generate_with_retry(ctx.completion(), &prompt, &pref.active_model, policy).await {
            Ok(answer) => answer,
            Err(e) => {
                error!(
                    turn = %turn_id,
                    model = %pref.active_model,
                    backend = ctx.completion().name(),
                    error = %e,
                    "generation failed"
                );
                let opts = SendOptions::plain().reply_to(msg.message_id);
                let notice = translate(Key::Error, pref.language);
                if let Err(e) = ctx.transport().send(msg.chat_id, notice, &opts).await {
                    warn!(turn = %turn_id, error = %e, "error notice not delivered");
                }
                return TurnOutcome::Failed(TurnFailure::Generation);
            }
        };

    debug!(turn = %turn_id, state = ?TurnState::Formatting, chars = answer.len(), "formatting reply");
    let composed = compose_reply(&pref.active_model, &answer, pref.language);
    let delivered = deliver(ctx, msg, &composed, turn_id).await;

    if let Err(e) = ctx.store().append_turn(user, &msg.text, &answer).await {
        warn!(turn = %turn_id, user, error = %e, "context write failed");
    }

    if delivered {
        info!(turn = %turn_id, chat_id = msg.chat_id, user, "turn delivered");
        TurnOutcome::Delivered
    } else {
        TurnOutcome::Failed(TurnFailure::Delivery)
    }
}

/// Send `composed` chunk by chunk as rich markup. Once a rich send is
/// rejected, that chunk and every later one go out as plain text instead, so
/// nothing already delivered is repeated. Returns whether every chunk got
/// through in one of the two modes.
pub(crate) async fn deliver<C: PipelineContext + ?Sized>(
    ctx: &C,
    msg: &InboundMessage,
    composed: &str,
    turn_id: Uuid,
) -> bool {
    let mut rich = true;
    let mut sent_any = false;

    for (index, source) in delivery_chunks(composed, MAX_MESSAGE_CHARS).iter().enumerate() {
        if rich {
            match send_parts(ctx, msg, &to_rich_markup(source), true, &mut sent_any).await {
                Ok(()) => continue,
                Err(e) => {
                    warn!(turn = %turn_id, chunk_index = index, error = %e, "rich delivery failed, falling back to plain text");
                    rich = false;
                }
            }
        }
        if let Err(e) = send_parts(ctx, msg, &to_plain_text(source), false, &mut sent_any).await {
            error!(turn = %turn_id, chunk_index = index, error = %e, "plain delivery failed");
            return false;
        }
    }
    true
}

/// Split `source` so each chunk still fits the message limit once rendered
/// as rich markup. Escaping can grow a chunk; those are split again at half
/// the size. A code block that alone exceeds the limit stays whole.
fn delivery_chunks(source: &str, max: usize) -> Vec<String> {
    split_for_delivery(source, max)
        .into_iter()
        .flat_map(|chunk| {
            let rendered = to_rich_markup(&chunk).chars().count();
            if max <= 1 || rendered <= MAX_MESSAGE_CHARS {
                vec![chunk]
            } else {
                delivery_chunks(&chunk, max / 2)
            }
        })
        .collect()
}

/// Send one rendered chunk, re-split in case it is an oversized code block.
/// Only the first message of the whole reply quotes the question.
async fn send_parts<C: PipelineContext + ?Sized>(
    ctx: &C,
    msg: &InboundMessage,
    rendered: &str,
    rich: bool,
    sent_any: &mut bool,
) -> Result<(), DeliveryError> {
    for part in split_for_delivery(rendered, MAX_MESSAGE_CHARS) {
        let mut opts = if rich {
            SendOptions::rich()
        } else {
            SendOptions::plain()
        };
        if !*sent_any {
            opts = opts.reply_to(msg.message_id);
        }
        ctx.transport().send(msg.chat_id, &part, &opts).await?;
        *sent_any = true;
    }
    Ok(())
}
