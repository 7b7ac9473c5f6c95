//! Command-line argument parsing and program wiring.

pub mod model_list;
pub mod provider_list;

use std::error::Error;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::api::dispatch::{ChatClient, Dispatcher};
use crate::cli::model_list::list_models;
use crate::cli::provider_list::list_providers;
use crate::core::app::App;
use crate::core::config::Config;
use crate::core::engine::ChatEngine;
use crate::core::history::FileHistoryStore;
use crate::core::providers::ProviderCatalog;
use crate::ui::repl::run_chat;

#[derive(Parser)]
#[command(name = "parley")]
#[command(about = "A terminal chat client for multiple AI chat-completion backends")]
#[command(
    long_about = "Parley keeps a set of conversations and sends them to interchangeable \
chat-completion backends: OpenAI-compatible cloud APIs or a local Ollama server.\n\n\
API keys come from the config file or each provider's environment variable \
(e.g. OPENAI_API_KEY). History is saved under your platform data directory \
unless incognito mode is on.\n\n\
Commands inside the chat:\n\
  /help /new /list /switch /retry /clear /provider /model /models /incognito /dump /quit"
)]
pub struct Args {
    /// Provider to use, or list available providers if none given
    #[arg(short = 'p', long, value_name = "PROVIDER", num_args = 0..=1, default_missing_value = "")]
    pub provider: Option<String>,

    /// Model to use, or list the provider's models if none given
    #[arg(short = 'm', long, value_name = "MODEL", num_args = 0..=1, default_missing_value = "")]
    pub model: Option<String>,

    /// Keep this session's history in memory only
    #[arg(long)]
    pub incognito: bool,
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = Config::load()?;
    let catalog = ProviderCatalog::load(&config);

    let requested_provider = args
        .provider
        .as_deref()
        .or(config.default_provider.as_deref());

    // Bare -p lists the catalog and exits.
    if requested_provider == Some("") {
        let default_id = catalog
            .default_provider()
            .map(|p| p.id.clone())
            .unwrap_or_default();
        list_providers(&catalog, &default_id);
        return Ok(());
    }

    let provider = match requested_provider {
        Some(id) => catalog
            .find(id)
            .ok_or_else(|| format!("unknown provider: {id} (use -p to list providers)"))?,
        None => catalog
            .default_provider()
            .ok_or("the provider catalog is empty")?,
    };
    let provider_id = provider.id.clone();

    let configured_model = config
        .default_model_for(&provider_id)
        .or_else(|| provider.default_model());

    // Bare -m lists the provider's models and exits.
    if args.model.as_deref() == Some("") {
        list_models(provider, configured_model);
        return Ok(());
    }

    let model = args
        .model
        .as_deref()
        .or(configured_model)
        .ok_or_else(|| format!("provider {provider_id} has no models to choose from"))?
        .to_string();

    let store = FileHistoryStore::new()?;
    let dispatcher: Arc<dyn Dispatcher> = Arc::new(ChatClient::new());
    let (mut engine, events) = ChatEngine::new(Box::new(store), Arc::clone(&dispatcher));
    engine.set_incognito(args.incognito || config.incognito_default());

    let app = App::new(engine, catalog, provider_id, model, dispatcher);
    run_chat(app, events).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn args_parse_cleanly() {
        Args::command().debug_assert();
    }

    #[test]
    fn bare_provider_flag_means_list() {
        let args = Args::parse_from(["parley", "-p"]);
        assert_eq!(args.provider.as_deref(), Some(""));

        let args = Args::parse_from(["parley", "-p", "ollama"]);
        assert_eq!(args.provider.as_deref(), Some("ollama"));

        let args = Args::parse_from(["parley"]);
        assert!(args.provider.is_none());
    }

    #[test]
    fn incognito_flag_defaults_off() {
        let args = Args::parse_from(["parley"]);
        assert!(!args.incognito);
        let args = Args::parse_from(["parley", "--incognito"]);
        assert!(args.incognito);
    }
}
