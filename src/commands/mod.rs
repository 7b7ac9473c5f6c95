//! Slash-command parsing and handlers for the chat loop.

mod registry;

pub use registry::{all_commands, CommandInvocation};

use std::fs::File;
use std::io::{BufWriter, Write};

use chrono::Utc;

use crate::core::app::App;

pub enum CommandResult {
    Continue,
    Quit,
    ProcessAsMessage(String),
    /// Model discovery needs the network; the chat loop awaits it.
    RefreshLocalModels,
}

pub fn process_input(app: &mut App, input: &str) -> CommandResult {
    let trimmed = input.trim();

    if !trimmed.starts_with('/') {
        return CommandResult::ProcessAsMessage(input.to_string());
    }

    let mut parts = trimmed[1..].splitn(2, ' ');
    let command_name = match parts.next() {
        Some(name) if !name.is_empty() => name,
        _ => return CommandResult::ProcessAsMessage(input.to_string()),
    };
    let args = parts.next().unwrap_or("").trim();

    if let Some(command) = registry::find_command(command_name) {
        let invocation = CommandInvocation {
            input: trimmed,
            args,
        };
        (command.handler)(app, invocation)
    } else {
        CommandResult::ProcessAsMessage(input.to_string())
    }
}

pub(super) fn handle_help(_app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    println!("Commands:");
    for command in all_commands() {
        println!("  /{:<10} {}", command.name, command.help);
    }
    CommandResult::Continue
}

pub(super) fn handle_new(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    app.engine.new_chat();
    println!("Started a new conversation.");
    CommandResult::Continue
}

pub(super) fn handle_list(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    let current_id = app.engine.current_id().map(str::to_string);
    for (index, conversation) in app.engine.conversations().iter().enumerate() {
        let marker = if current_id.as_deref() == Some(conversation.id.as_str()) {
            "*"
        } else {
            " "
        };
        println!(
            "{marker} {:>2}. {} ({} messages)",
            index + 1,
            conversation.title,
            conversation.messages.len()
        );
    }
    CommandResult::Continue
}

pub(super) fn handle_switch(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let Ok(number) = invocation.args.parse::<usize>() else {
        println!("Usage: /switch <number> (see /list)");
        return CommandResult::Continue;
    };
    let Some(conversation) = app
        .engine
        .conversations()
        .get(number.wrapping_sub(1))
        .map(|c| (c.id.clone(), c.title.clone()))
    else {
        println!("No conversation {number}; see /list.");
        return CommandResult::Continue;
    };
    app.engine.select_conversation(&conversation.0);
    println!("Switched to: {}", conversation.1);
    CommandResult::Continue
}

pub(super) fn handle_retry(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    if app.retry_last() {
        println!("Regenerating…");
    } else {
        println!("Nothing to retry in this conversation.");
    }
    CommandResult::Continue
}

pub(super) fn handle_clear(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    app.engine.clear_history();
    println!("History cleared.");
    CommandResult::Continue
}

pub(super) fn handle_provider(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    if invocation.args.is_empty() {
        for provider in app.catalog.providers() {
            let marker = if provider.id == app.provider_id() {
                "*"
            } else {
                " "
            };
            let kind = if provider.local { "local" } else { "remote" };
            println!(
                "{marker} {:<10} {} [{kind}] {}",
                provider.id, provider.display_name, provider.base_url
            );
        }
        return CommandResult::Continue;
    }

    match app.select_provider(invocation.args) {
        Ok(()) => println!(
            "Provider: {} (model: {})",
            app.provider().display_name,
            app.model()
        ),
        Err(err) => println!("{err}"),
    }
    CommandResult::Continue
}

pub(super) fn handle_model(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    if invocation.args.is_empty() {
        println!("Models for {}:", app.provider().display_name);
        for model in &app.provider().models {
            let marker = if model == app.model() { "*" } else { " " };
            println!("{marker} {model}");
        }
        return CommandResult::Continue;
    }

    match app.select_model(invocation.args) {
        Ok(()) => println!("Model: {}", app.model()),
        Err(err) => println!("{err}"),
    }
    CommandResult::Continue
}

pub(super) fn handle_models(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    if app.catalog.find_local().is_none() {
        println!("No local backend in the catalog.");
        return CommandResult::Continue;
    }
    CommandResult::RefreshLocalModels
}

pub(super) fn handle_incognito(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    let on = !app.engine.incognito();
    app.engine.set_incognito(on);
    if on {
        println!("Incognito on: nothing will be written to disk.");
    } else {
        println!("Incognito off: history persistence resumed.");
    }
    CommandResult::Continue
}

pub(super) fn handle_dump(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let filename = if invocation.args.is_empty() {
        format!("parley-log-{}.txt", Utc::now().format("%Y-%m-%d"))
    } else {
        invocation.args.to_string()
    };

    match dump_conversation(app, &filename) {
        Ok(()) => println!("Transcript written to {filename}"),
        Err(err) => println!("Dump failed: {err}"),
    }
    CommandResult::Continue
}

pub(super) fn handle_quit(_app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    CommandResult::Quit
}

fn dump_conversation(app: &App, filename: &str) -> Result<(), Box<dyn std::error::Error>> {
    let Some(conversation) = app.engine.current() else {
        return Err("no conversation selected".into());
    };

    let file = File::create(filename)?;
    let mut writer = BufWriter::new(file);
    for message in &conversation.messages {
        if message.is_user() {
            writeln!(writer, "You: {}", message.text)?;
        } else {
            writeln!(writer, "{}", message.text)?;
        }
        writeln!(writer)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::dispatch::ChatClient;
    use crate::core::config::Config;
    use crate::core::engine::ChatEngine;
    use crate::core::history::MemoryHistoryStore;
    use crate::core::providers::ProviderCatalog;
    use std::sync::Arc;

    fn test_app() -> App {
        let catalog = ProviderCatalog::load(&Config::default());
        let provider_id = catalog.default_provider().unwrap().id.clone();
        let model = catalog
            .default_provider()
            .unwrap()
            .default_model()
            .unwrap()
            .to_string();
        let dispatcher = Arc::new(ChatClient::new());
        let (engine, _rx) = ChatEngine::new(
            Box::new(MemoryHistoryStore::new()),
            dispatcher.clone() as Arc<dyn crate::api::dispatch::Dispatcher>,
        );
        App::new(engine, catalog, provider_id, model, dispatcher)
    }

    #[tokio::test]
    async fn plain_text_passes_through_as_a_message() {
        let mut app = test_app();
        match process_input(&mut app, "hello world") {
            CommandResult::ProcessAsMessage(text) => assert_eq!(text, "hello world"),
            _ => panic!("expected message passthrough"),
        }
    }

    #[tokio::test]
    async fn unknown_slash_input_passes_through_as_a_message() {
        let mut app = test_app();
        match process_input(&mut app, "/does-not-exist") {
            CommandResult::ProcessAsMessage(text) => assert_eq!(text, "/does-not-exist"),
            _ => panic!("expected message passthrough"),
        }
    }

    #[tokio::test]
    async fn new_command_prepends_a_conversation() {
        let mut app = test_app();
        assert_eq!(app.engine.conversations().len(), 1);
        assert!(matches!(
            process_input(&mut app, "/new"),
            CommandResult::Continue
        ));
        assert_eq!(app.engine.conversations().len(), 2);
    }

    #[tokio::test]
    async fn quit_command_quits() {
        let mut app = test_app();
        assert!(matches!(process_input(&mut app, "/quit"), CommandResult::Quit));
        assert!(matches!(process_input(&mut app, "/QUIT"), CommandResult::Quit));
    }

    #[tokio::test]
    async fn incognito_command_toggles() {
        let mut app = test_app();
        assert!(!app.engine.incognito());
        process_input(&mut app, "/incognito");
        assert!(app.engine.incognito());
        process_input(&mut app, "/incognito");
        assert!(!app.engine.incognito());
    }

    #[tokio::test]
    async fn provider_command_switches_and_validates() {
        let mut app = test_app();
        process_input(&mut app, "/provider ollama");
        assert_eq!(app.provider_id(), "ollama");
        process_input(&mut app, "/provider no-such-provider");
        assert_eq!(app.provider_id(), "ollama");
    }

    #[tokio::test]
    async fn models_command_requests_a_refresh() {
        let mut app = test_app();
        assert!(matches!(
            process_input(&mut app, "/models"),
            CommandResult::RefreshLocalModels
        ));
    }
}
