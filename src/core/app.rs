//! Session-level state for one running client: the engine plus the
//! provider/model selection the next dispatch will use.
//!
//! Selection is explicit state here rather than a process-wide singleton so
//! several `App` instances can coexist (tests run them side by side).

use std::sync::Arc;

use crate::api::dispatch::Dispatcher;
use crate::core::engine::ChatEngine;
use crate::core::providers::{ProviderCatalog, ProviderDescriptor};

pub struct App {
    pub engine: ChatEngine,
    pub catalog: ProviderCatalog,
    provider_id: String,
    model: String,
    dispatcher: Arc<dyn Dispatcher>,
}

impl App {
    pub fn new(
        engine: ChatEngine,
        catalog: ProviderCatalog,
        provider_id: String,
        model: String,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Self {
        Self {
            engine,
            catalog,
            provider_id,
            model,
            dispatcher,
        }
    }

    pub fn provider(&self) -> &ProviderDescriptor {
        self.catalog
            .find(&self.provider_id)
            .expect("selected provider exists in the catalog")
    }

    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Switch providers, resetting the model to that provider's default.
    pub fn select_provider(&mut self, id: &str) -> Result<(), String> {
        let provider = self
            .catalog
            .find(id)
            .ok_or_else(|| format!("unknown provider: {id}"))?;
        self.provider_id = provider.id.clone();
        self.model = provider.default_model().unwrap_or_default().to_string();
        Ok(())
    }

    /// Switch models within the current provider.
    pub fn select_model(&mut self, model: &str) -> Result<(), String> {
        if model.trim().is_empty() {
            return Err("model name cannot be empty".to_string());
        }
        self.model = model.trim().to_string();
        Ok(())
    }

    /// Send through the engine with the session's current selection.
    pub fn send_message(&mut self, text: &str) -> bool {
        let provider = self
            .catalog
            .find(&self.provider_id)
            .cloned()
            .expect("selected provider exists in the catalog");
        self.engine.send_user_message(text, &provider, &self.model)
    }

    /// Regenerate the last assistant turn of the current conversation.
    pub fn retry_last(&mut self) -> bool {
        let Some(conversation) = self.engine.current() else {
            return false;
        };
        let Some(index) = conversation.last_assistant_index() else {
            return false;
        };
        let id = conversation.id.clone();
        let provider = self
            .catalog
            .find(&self.provider_id)
            .cloned()
            .expect("selected provider exists in the catalog");
        self.engine.retry(&id, index, &provider, &self.model)
    }

    /// Re-run model discovery against the local backend and fold the result
    /// into the catalog. Returns how many models the backend reported; zero
    /// means the known-good list was left untouched.
    pub async fn refresh_local_models(&mut self) -> usize {
        let Some(local) = self.catalog.find_local().cloned() else {
            return 0;
        };
        let models = self.dispatcher.discover_local_models(&local).await;
        let count = models.len();
        self.catalog.update_local_models(models);
        count
    }
}
