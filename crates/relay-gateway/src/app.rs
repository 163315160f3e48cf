use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use relay_agent::pipeline::{ChatTransport, PipelineContext};
use relay_agent::{AdmissionControl, CompletionClient, PromptMessage};
use relay_core::RelayConfig;
use relay_store::{ContextStore, KvStore};

/// Central shared state, passed as Arc<AppState> to all Axum handlers and
/// to the Telegram adapter as its pipeline context.
pub struct AppState {
    pub config: RelayConfig,
    pub kv: Arc<dyn KvStore>,
    pub store: ContextStore,
    pub admission: AdmissionControl,
    pub completion: Box<dyn CompletionClient>,
    pub transport: Box<dyn ChatTransport>,
    pub system_message: PromptMessage,
}

impl PipelineContext for AppState {
    fn config(&self) -> &RelayConfig {
        &self.config
    }

    fn store(&self) -> &ContextStore {
        &self.store
    }

    fn admission(&self) -> &AdmissionControl {
        &self.admission
    }

    fn completion(&self) -> &dyn CompletionClient {
        self.completion.as_ref()
    }

    fn transport(&self) -> &dyn ChatTransport {
        self.transport.as_ref()
    }

    fn system_message(&self) -> &PromptMessage {
        &self.system_message
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route(
            "/telegram/webhook",
            post(crate::http::telegram::webhook_handler),
        )
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
