use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreError;

/// String-keyed, string-valued store with optional per-key expiry.
///
/// No transactions: every operation stands alone and is safe to retry.
/// Expiry is owned by the backend; callers never sweep old keys themselves.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Insert or overwrite `key`. `ttl = None` keeps the value indefinitely.
    async fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError>;

    /// Remove `key`. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Epoch milliseconds at which a value written now with `ttl` expires.
pub(crate) fn expiry_ms(now_ms: i64, ttl: Option<Duration>) -> Option<i64> {
    ttl.map(|ttl| now_ms.saturating_add(ttl.as_millis().min(i64::MAX as u128) as i64))
}

pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
