//! Telegram webhook ingress: POST /telegram/webhook.
//!
//! When `telegram.webhook_secret` is set, requests must carry it in the
//! `X-Telegram-Bot-Api-Secret-Token` header. Accepted updates are processed
//! in a spawned task; the response is sent before any work happens.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use teloxide::types::Update;
use tracing::{debug, warn};

use crate::app::AppState;

pub const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

fn verify_secret(headers: &HeaderMap, expected: Option<&str>) -> Result<(), &'static str> {
    let Some(expected) = expected.filter(|s| !s.is_empty()) else {
        return Ok(());
    };
    let provided = headers
        .get(SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or("missing secret token header")?;
    if provided == expected {
        Ok(())
    } else {
        Err("secret token mismatch")
    }
}

pub async fn webhook_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    verify_secret(&headers, state.config.telegram.webhook_secret.as_deref()).map_err(|reason| {
        warn!(reason, "telegram webhook authentication failed");
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "authentication failed"})),
        )
    })?;

    let update: Update = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, bytes = body.len(), "invalid telegram update");
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid update"})),
        )
    })?;

    debug!(update_id = update.id.0, "telegram update received");
    relay_telegram::dispatch_update(state, update);
    Ok(Json(json!({"ok": true})))
}
