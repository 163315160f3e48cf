//! Whitelist and per-chat cooldown gate in front of the pipeline.

use std::time::Duration;

use relay_core::ChatKind;
use relay_store::CooldownRecords;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// Private chat with a sender who is not whitelisted.
    Unauthorized,
    /// Shared chat still inside its cooldown window.
    Cooldown { wait_ms: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    Denied(DenyReason),
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted)
    }
}

pub struct AdmissionControl {
    whitelist: Vec<String>,
    window: Duration,
    records: CooldownRecords,
}

impl AdmissionControl {
    pub fn new(whitelist: Vec<String>, window: Duration, records: CooldownRecords) -> Self {
        let whitelist = whitelist
            .into_iter()
            .map(|w| w.trim().to_string())
            .filter(|w| !w.is_empty())
            .collect();
        Self {
            whitelist,
            window,
            records,
        }
    }

    pub fn is_whitelisted(&self, sender_id: &str) -> bool {
        self.whitelist.iter().any(|w| w == "*" || w == sender_id)
    }

    pub async fn is_admitted(&self, sender_id: &str, chat_kind: ChatKind, chat_id: i64) -> Admission {
        let now = chrono::Utc::now().timestamp_millis();
        self.is_admitted_at(sender_id, chat_kind, chat_id, now).await
    }

    /// Admission decision at `now_ms`. Admitting a non-whitelisted sender in a
    /// shared chat overwrites the chat's cooldown record.
    ///
    /// Storage failures fail open: an unreadable record counts as absent and
    /// a failed write is only logged.
    pub async fn is_admitted_at(
        &self,
        sender_id: &str,
        chat_kind: ChatKind,
        chat_id: i64,
        now_ms: i64,
    ) -> Admission {
        if self.is_whitelisted(sender_id) {
            return Admission::Admitted;
        }
        if !chat_kind.is_shared() {
            return Admission::Denied(DenyReason::Unauthorized);
        }
        if self.window.is_zero() {
            return Admission::Admitted;
        }

        let window_ms = self.window.as_millis().min(u64::MAX as u128) as u64;
        let last = match self.records.last_request(chat_id).await {
            Ok(last) => last,
            Err(e) => {
                warn!(chat_id, error = %e, "cooldown read failed, treating as absent");
                None
            }
        };

        if let Some(last) = last {
            let elapsed = now_ms.saturating_sub(last).max(0) as u64;
            if elapsed < window_ms {
                let wait_ms = window_ms - elapsed;
                debug!(chat_id, wait_ms, "cooldown active");
                return Admission::Denied(DenyReason::Cooldown { wait_ms });
            }
        }

        if let Err(e) = self.records.record(chat_id, now_ms, self.window).await {
            warn!(chat_id, error = %e, "cooldown write failed");
        }
        Admission::Admitted
    }
}
