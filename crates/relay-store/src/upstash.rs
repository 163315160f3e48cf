//! Upstash Redis over its REST API.
//!
//! Each command is POSTed as a JSON array (`["SET", key, value, "EX", 60]`)
//! and answered with `{"result": ...}` or `{"error": "..."}`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::kv::KvStore;

pub struct UpstashKv {
    client: reqwest::Client,
    url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct CommandResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

impl UpstashKv {
    pub fn new(url: String, token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.trim_end_matches('/').to_string(),
            token,
        }
    }

    async fn command(&self, args: Value) -> Result<Option<Value>, StoreError> {
        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&args)
            .send()
            .await?;

        let status = resp.status().as_u16();
        let body: CommandResponse = resp
            .json()
            .await
            .map_err(|e| StoreError::Backend(format!("invalid upstash response: {e}")))?;

        if let Some(error) = body.error {
            warn!(status, error = %error, "upstash command failed");
            return Err(StoreError::Backend(error));
        }
        Ok(body.result)
    }
}

/// Redis `EX` takes whole seconds; round up so a short TTL never becomes zero.
fn ttl_secs(ttl: Duration) -> u64 {
    let secs = ttl.as_secs();
    if ttl.subsec_nanos() > 0 || secs == 0 {
        secs + 1
    } else {
        secs
    }
}

fn set_command(key: &str, value: &str, ttl: Option<Duration>) -> Value {
    match ttl {
        Some(ttl) => json!(["SET", key, value, "EX", ttl_secs(ttl)]),
        None => json!(["SET", key, value]),
    }
}

#[async_trait]
impl KvStore for UpstashKv {
    fn name(&self) -> &str {
        "upstash"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.command(json!(["GET", key])).await? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Ok(Some(other.to_string())),
        }
    }

    async fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        debug!(key, "upstash SET");
        self.command(set_command(key, value, ttl)).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.command(json!(["DEL", key])).await?;
        Ok(())
    }
}
