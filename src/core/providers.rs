//! Provider catalog
//!
//! The default catalog ships embedded in the binary
//! (`builtin_providers.toml`) and is static for the life of the process,
//! with one exception: the local backend's model list can be refreshed via
//! model discovery.

use serde::{Deserialize, Serialize};

use crate::core::config::Config;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    pub id: String,
    pub display_name: String,
    pub base_url: String,
    /// Environment variable consulted for the bearer token; never the token
    /// itself.
    pub api_key_env: Option<String>,
    /// Resolved bearer token, filled in at catalog load.
    #[serde(skip)]
    pub api_key: Option<String>,
    pub models: Vec<String>,
    #[serde(default)]
    pub requires_model: bool,
    /// Local model-serving backend (Ollama wire protocol, no API key).
    #[serde(default)]
    pub local: bool,
}

impl ProviderDescriptor {
    pub fn default_model(&self) -> Option<&str> {
        self.models.first().map(String::as_str)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ProviderCatalogFile {
    providers: Vec<ProviderDescriptor>,
}

/// Ordered provider set. The first entry is the default selection.
#[derive(Debug, Clone)]
pub struct ProviderCatalog {
    providers: Vec<ProviderDescriptor>,
}

impl ProviderCatalog {
    /// Load the embedded catalog, resolving API keys from the config file
    /// first and the per-provider environment variable second.
    pub fn load(config: &Config) -> Self {
        const CATALOG_CONTENT: &str = include_str!("../builtin_providers.toml");

        let file: ProviderCatalogFile =
            toml::from_str(CATALOG_CONTENT).expect("failed to parse builtin_providers.toml");

        let mut catalog = Self {
            providers: file.providers,
        };
        for provider in &mut catalog.providers {
            provider.api_key = config
                .api_key_for(&provider.id)
                .map(str::to_string)
                .or_else(|| {
                    provider
                        .api_key_env
                        .as_deref()
                        .and_then(|var| std::env::var(var).ok())
                });
        }
        catalog
    }

    /// Build a catalog from explicit descriptors. Used by tests and anywhere
    /// the embedded defaults should not apply.
    pub fn from_descriptors(providers: Vec<ProviderDescriptor>) -> Self {
        Self { providers }
    }

    pub fn providers(&self) -> &[ProviderDescriptor] {
        &self.providers
    }

    pub fn default_provider(&self) -> Option<&ProviderDescriptor> {
        self.providers.first()
    }

    pub fn find(&self, id: &str) -> Option<&ProviderDescriptor> {
        self.providers.iter().find(|p| p.id.eq_ignore_ascii_case(id))
    }

    pub fn find_local(&self) -> Option<&ProviderDescriptor> {
        self.providers.iter().find(|p| p.local)
    }

    /// Replace the local provider's model list after a discovery pass.
    ///
    /// No-op when there is no local provider or when `names` is empty: a
    /// failed refresh must not erase a previously known-good list.
    pub fn update_local_models(&mut self, names: Vec<String>) {
        if names.is_empty() {
            return;
        }
        if let Some(provider) = self.providers.iter_mut().find(|p| p.local) {
            provider.models = names;
        }
    }
}
