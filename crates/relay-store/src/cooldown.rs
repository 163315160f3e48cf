use std::sync::Arc;
use std::time::Duration;

use crate::error::StoreError;
use crate::kv::KvStore;

/// Per-chat timestamp of the last admitted non-whitelisted request.
///
/// Stored under `last_request:{chat_id}` as epoch milliseconds, expiring
/// after one cooldown window so stale records clean themselves up.
#[derive(Clone)]
pub struct CooldownRecords {
    kv: Arc<dyn KvStore>,
}

fn key(chat_id: i64) -> String {
    format!("last_request:{chat_id}")
}

impl CooldownRecords {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Last admitted request time, or `None` when absent or unparseable.
    pub async fn last_request(&self, chat_id: i64) -> Result<Option<i64>, StoreError> {
        let raw = self.kv.get(&key(chat_id)).await?;
        Ok(raw.and_then(|v| v.trim().parse::<i64>().ok()))
    }

    pub async fn record(&self, chat_id: i64, now_ms: i64, window: Duration) -> Result<(), StoreError> {
        let ttl = Duration::from_secs(window.as_millis().div_ceil(1000) as u64);
        self.kv
            .put(&key(chat_id), &now_ms.to_string(), Some(ttl))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryKv;

    #[tokio::test]
    async fn record_then_read_back() {
        let kv = Arc::new(MemoryKv::new());
        let records = CooldownRecords::new(kv.clone());
        assert_eq!(records.last_request(-100).await.unwrap(), None);

        records
            .record(-100, 1_700_000_000_000, Duration::from_millis(180_000))
            .await
            .unwrap();
        assert_eq!(
            records.last_request(-100).await.unwrap(),
            Some(1_700_000_000_000)
        );
        assert_eq!(
            kv.get("last_request:-100").await.unwrap().as_deref(),
            Some("1700000000000")
        );
    }

    #[tokio::test]
    async fn garbage_value_reads_as_absent() {
        let kv = Arc::new(MemoryKv::new());
        kv.put("last_request:7", "not-a-number", None).await.unwrap();
        let records = CooldownRecords::new(kv);
        assert_eq!(records.last_request(7).await.unwrap(), None);
    }
}
