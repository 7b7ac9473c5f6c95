//! Line-oriented chat loop.
//!
//! Reads stdin lines and dispatch completions concurrently: a reply may
//! arrive while the user is typing into another conversation, in which case
//! it is labeled with its conversation's title and still applied there.

use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::api::DispatchOutcome;
use crate::commands::{self, CommandResult};
use crate::core::app::App;
use crate::core::engine::DispatchEvent;

pub async fn run_chat(
    mut app: App,
    mut events: mpsc::UnboundedReceiver<DispatchEvent>,
) -> Result<(), Box<dyn std::error::Error>> {
    println!(
        "parley — provider: {} (model: {}). Type /help for commands.",
        app.provider().display_name,
        app.model()
    );
    if app.engine.conversations().len() > 1 || !app.engine.current().map_or(true, |c| c.is_empty())
    {
        println!(
            "Restored {} conversation(s) from history.",
            app.engine.conversations().len()
        );
    }

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    prompt()?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match commands::process_input(&mut app, &line) {
                    CommandResult::Continue => {}
                    CommandResult::Quit => break,
                    CommandResult::RefreshLocalModels => {
                        let found = app.refresh_local_models().await;
                        if found == 0 {
                            println!("Local backend unreachable; keeping the known model list.");
                        } else {
                            println!("Local backend serves {found} model(s).");
                        }
                    }
                    CommandResult::ProcessAsMessage(text) => {
                        if !app.send_message(&text) && !text.trim().is_empty() {
                            println!("No conversation selected; use /new.");
                        }
                    }
                }
                prompt()?;
            }
            event = events.recv() => {
                let Some(event) = event else { break };
                print_reply(&app, &event);
                app.engine.apply_dispatch(event);
                prompt()?;
            }
        }
    }

    Ok(())
}

fn print_reply(app: &App, event: &DispatchEvent) {
    let label = if app.engine.current_id() == Some(event.conversation_id.as_str()) {
        String::new()
    } else {
        // Reply for a conversation the user navigated away from.
        app.engine
            .conversations()
            .iter()
            .find(|c| c.id == event.conversation_id)
            .map(|c| format!(" [{}]", c.title))
            .unwrap_or_else(|| " [gone]".to_string())
    };

    let text = match &event.outcome {
        DispatchOutcome::Success(text) | DispatchOutcome::Failure(text) => text,
    };
    println!("\nassistant{label}: {text}");
}

fn prompt() -> std::io::Result<()> {
    print!("> ");
    std::io::stdout().flush()
}
