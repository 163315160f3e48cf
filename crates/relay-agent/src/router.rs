use async_trait::async_trait;
use relay_core::ModelCatalog;
use tracing::debug;

use crate::provider::{CompletionClient, CompletionError, PromptMessage};

/// A backend and the models it serves.
pub struct CatalogSlot {
    pub catalog: ModelCatalog,
    pub client: Box<dyn CompletionClient>,
}

impl CatalogSlot {
    pub fn new(catalog: ModelCatalog, client: Box<dyn CompletionClient>) -> Self {
        Self { catalog, client }
    }
}

/// Dispatches each request to the slot whose catalog lists the model.
///
/// Slots are fixed at construction. `list_models` concatenates the slot
/// catalogs in order, so the first slot's first model is the default.
pub struct CatalogRouter {
    slots: Vec<CatalogSlot>,
}

impl CatalogRouter {
    pub fn new(slots: Vec<CatalogSlot>) -> Self {
        Self { slots }
    }

    fn slot_for(&self, model: &str) -> Option<&CatalogSlot> {
        self.slots.iter().find(|s| s.catalog.contains(model))
    }
}

#[async_trait]
impl CompletionClient for CatalogRouter {
    fn name(&self) -> &str {
        "router"
    }

    async fn generate(
        &self,
        prompt: &[PromptMessage],
        model: &str,
    ) -> Result<String, CompletionError> {
        let slot = self
            .slot_for(model)
            .ok_or_else(|| CompletionError::UnknownModel(model.to_string()))?;
        debug!(model, backend = slot.client.name(), "routing completion");
        slot.client.generate(prompt, model).await
    }

    fn is_valid_model(&self, model: &str) -> bool {
        self.slot_for(model).is_some()
    }

    fn list_models(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for slot in &self.slots {
            for model in slot.catalog.models() {
                if !out.contains(model) {
                    out.push(model.clone());
                }
            }
        }
        out
    }
}
