use std::time::Duration;

use relay_core::config::AgentConfig;
use tracing::{info, warn};

use crate::provider::{CompletionClient, CompletionError, PromptMessage};

/// Retry schedule for overloaded backends: `max_retries` extra attempts,
/// sleeping `initial_backoff` and doubling before each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(agent: &AgentConfig) -> Self {
        Self {
            max_retries: agent.max_retries,
            initial_backoff: Duration::from_millis(agent.initial_backoff_ms),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(1000),
        }
    }
}

/// Call `generate`, retrying only [`CompletionError::Overloaded`].
pub async fn generate_with_retry(
    client: &dyn CompletionClient,
    prompt: &[PromptMessage],
    model: &str,
    policy: RetryPolicy,
) -> Result<String, CompletionError> {
    let mut attempt: u32 = 0;
    let mut delay = policy.initial_backoff;

    loop {
        match client.generate(prompt, model).await {
            Ok(text) => {
                if attempt > 0 {
                    info!(model, attempt, "completion succeeded after retry");
                }
                return Ok(text);
            }
            Err(e) if e.is_retryable() && attempt < policy.max_retries => {
                warn!(
                    model,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    err = %e,
                    "backend overloaded, retrying"
                );
                tokio::time::sleep(delay).await;
                delay = delay.saturating_mul(2);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
