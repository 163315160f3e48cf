use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One role-tagged entry of a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: String,
    pub content: String,
}

impl PromptMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }
}

/// Common interface for completion backends.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Backend name for logging and error messages.
    fn name(&self) -> &str;

    /// Generate one reply for `prompt` using `model`.
    async fn generate(&self, prompt: &[PromptMessage], model: &str)
        -> Result<String, CompletionError>;

    fn is_valid_model(&self, model: &str) -> bool;

    /// Selectable models in catalog order; the first is the default.
    fn list_models(&self) -> Vec<String>;
}

#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    /// Backend is temporarily out of capacity. The only retryable class.
    #[error("backend overloaded: {0}")]
    Overloaded(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("backend returned no choices")]
    EmptyResult,

    #[error("unknown model: {0}")]
    UnknownModel(String),
}

impl CompletionError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, CompletionError::Overloaded(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_overload_is_retryable() {
        assert!(CompletionError::Overloaded("busy".into()).is_retryable());
        assert!(!CompletionError::EmptyResult.is_retryable());
        assert!(!CompletionError::Api {
            status: 400,
            message: "bad".into()
        }
        .is_retryable());
        assert!(!CompletionError::UnknownModel("x".into()).is_retryable());
    }

    #[test]
    fn prompt_message_serializes_flat() {
        let json = serde_json::to_value(PromptMessage::user("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "user", "content": "hi"}));
    }
}
