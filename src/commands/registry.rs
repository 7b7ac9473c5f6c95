use super::CommandResult;
use crate::core::app::App;

pub type CommandHandler = fn(&mut App, CommandInvocation<'_>) -> CommandResult;

pub struct Command {
    pub name: &'static str,
    pub help: &'static str,
    pub handler: CommandHandler,
}

#[derive(Clone, Copy)]
pub struct CommandInvocation<'a> {
    pub input: &'a str,
    pub args: &'a str,
}

pub fn all_commands() -> &'static [Command] {
    COMMANDS
}

pub fn find_command(name: &str) -> Option<&'static Command> {
    all_commands()
        .iter()
        .find(|command| command.name.eq_ignore_ascii_case(name))
}

const COMMANDS: &[Command] = &[
    Command {
        name: "help",
        help: "Show available commands.",
        handler: super::handle_help,
    },
    Command {
        name: "new",
        help: "Start a new conversation.",
        handler: super::handle_new,
    },
    Command {
        name: "list",
        help: "List conversations; the current one is marked.",
        handler: super::handle_list,
    },
    Command {
        name: "switch",
        help: "Switch to conversation N (see /list).",
        handler: super::handle_switch,
    },
    Command {
        name: "retry",
        help: "Regenerate the last assistant reply.",
        handler: super::handle_retry,
    },
    Command {
        name: "clear",
        help: "Delete all conversations and saved history.",
        handler: super::handle_clear,
    },
    Command {
        name: "provider",
        help: "Show providers or switch providers.",
        handler: super::handle_provider,
    },
    Command {
        name: "model",
        help: "Show models for the current provider or switch models.",
        handler: super::handle_model,
    },
    Command {
        name: "models",
        help: "Refresh the local backend's model list.",
        handler: super::handle_models,
    },
    Command {
        name: "incognito",
        help: "Toggle incognito mode (history stays in memory only).",
        handler: super::handle_incognito,
    },
    Command {
        name: "dump",
        help: "Export the current transcript to a text file.",
        handler: super::handle_dump,
    },
    Command {
        name: "quit",
        help: "Exit.",
        handler: super::handle_quit,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        assert!(find_command("RETRY").is_some());
        assert!(find_command("retry").is_some());
        assert!(find_command("retyr").is_none());
    }

    #[test]
    fn every_command_has_help_text() {
        for command in all_commands() {
            assert!(!command.name.is_empty());
            assert!(!command.help.is_empty());
        }
    }
}
