use async_trait::async_trait;
use relay_core::ModelCatalog;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::provider::{CompletionClient, CompletionError, PromptMessage};

/// Any backend speaking the OpenAI chat-completions protocol (Gemini's
/// compatibility endpoint, OpenAI, OpenRouter, local servers).
pub struct OpenAiCompatClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    catalog: ModelCatalog,
}

impl OpenAiCompatClient {
    pub fn new(api_key: String, base_url: String, catalog: ModelCatalog) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            catalog,
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompatClient {
    fn name(&self) -> &str {
        "openai-compat"
    }

    async fn generate(
        &self,
        prompt: &[PromptMessage],
        model: &str,
    ) -> Result<String, CompletionError> {
        if !self.is_valid_model(model) {
            return Err(CompletionError::UnknownModel(model.to_string()));
        }
        let body = build_request_body(prompt, model);
        let url = format!("{}/chat/completions", self.base_url);

        debug!(model, entries = prompt.len(), "sending completion request");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status, body = %text, "completion API error");
            return Err(classify_failure(status, text));
        }

        let api_resp: ApiResponse = resp
            .json()
            .await
            .map_err(|e| CompletionError::Parse(e.to_string()))?;
        parse_response(api_resp)
    }

    fn is_valid_model(&self, model: &str) -> bool {
        self.catalog.contains(model)
    }

    fn list_models(&self) -> Vec<String> {
        self.catalog.models().to_vec()
    }
}

fn build_request_body(prompt: &[PromptMessage], model: &str) -> serde_json::Value {
    serde_json::json!({
        "model": model,
        "messages": prompt,
        "n": 1,
    })
}

/// 429 and 503 are capacity problems, as is any error body that says so.
fn classify_failure(status: u16, body: String) -> CompletionError {
    if status == 429 || status == 503 || body.to_ascii_lowercase().contains("overloaded") {
        CompletionError::Overloaded(format!("status {status}"))
    } else {
        CompletionError::Api {
            status,
            message: body,
        }
    }
}

fn parse_response(resp: ApiResponse) -> Result<String, CompletionError> {
    let choice = resp
        .choices
        .into_iter()
        .next()
        .ok_or(CompletionError::EmptyResult)?;
    Ok(choice.message.content.unwrap_or_default())
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    content: Option<String>,
}
