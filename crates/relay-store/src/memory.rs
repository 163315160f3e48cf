//! In-process KV backend. Used for tests and single-instance deployments
//! that can afford to lose state on restart.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::StoreError;
use crate::kv::{expiry_ms, now_ms, KvStore};

struct Entry {
    value: String,
    expires_at_ms: Option<i64>,
}

#[derive(Default)]
pub struct MemoryKv {
    entries: DashMap<String, Entry>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) keys.
    pub fn len(&self) -> usize {
        let now = now_ms();
        self.entries
            .iter()
            .filter(|e| e.expires_at_ms.map_or(true, |at| at > now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = now_ms();
        let expired = match self.entries.get(key) {
            Some(entry) => match entry.expires_at_ms {
                Some(at) if at <= now => true,
                _ => return Ok(Some(entry.value.clone())),
            },
            None => return Ok(None),
        };
        if expired {
            self.entries
                .remove_if(key, |_, e| e.expires_at_ms.is_some_and(|at| at <= now));
        }
        Ok(None)
    }

    async fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at_ms: expiry_ms(now_ms(), ttl),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}
