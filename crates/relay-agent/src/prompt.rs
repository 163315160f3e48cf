//! Prompt assembly and the deployment-wide system message.

use relay_core::config::AgentConfig;
use relay_store::KvStore;
use serde::Deserialize;
use tracing::{info, warn};

use crate::provider::PromptMessage;

/// KV key holding an optional `{"role": ..., "content": ...}` override.
pub const SYSTEM_MESSAGE_KEY: &str = "SYSTEM_INIT_MESSAGE";

#[derive(Debug, Deserialize)]
struct SystemOverride {
    role: Option<String>,
    content: Option<String>,
}

/// System entry from config, with any fields present in the KV override
/// taking precedence. A missing or unparseable override is ignored.
pub async fn load_system_message(kv: &dyn KvStore, agent: &AgentConfig) -> PromptMessage {
    let mut message = PromptMessage::new(agent.system_role.clone(), agent.system_prompt.clone());

    let raw = match kv.get(SYSTEM_MESSAGE_KEY).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return message,
        Err(e) => {
            warn!(error = %e, "could not read system message override");
            return message;
        }
    };

    match serde_json::from_str::<SystemOverride>(&raw) {
        Ok(over) => {
            if let Some(role) = over.role.filter(|r| !r.trim().is_empty()) {
                message.role = role;
            }
            if let Some(content) = over.content {
                message.content = content;
            }
            info!(role = %message.role, "system message override loaded");
        }
        Err(e) => warn!(error = %e, "ignoring unparseable system message override"),
    }
    message
}

/// `[system, context?, current]`. The context entry is present only when
/// there is non-blank prior context.
pub fn assemble_prompt(
    system: &PromptMessage,
    context: Option<&str>,
    current: &str,
) -> Vec<PromptMessage> {
    let mut prompt = Vec::with_capacity(3);
    prompt.push(system.clone());
    if let Some(context) = context.filter(|c| !c.trim().is_empty()) {
        prompt.push(PromptMessage::user(context));
    }
    prompt.push(PromptMessage::user(current));
    prompt
}

/// Two-entry prompt asking the model to summarise `context` in `language`.
pub fn summary_prompt(context: &str, language: &str) -> Vec<PromptMessage> {
    vec![
        PromptMessage::new(
            "system",
            format!("Summarize the following conversation in {language}:"),
        ),
        PromptMessage::user(context),
    ]
}
