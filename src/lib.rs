//! Parley is a terminal chat client that talks to multiple chat-completion
//! backends, cloud or local, through one conversation engine.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns conversation state: the collection, the current-
//!   conversation cursor, the mutation rules for send/retry/new/clear, the
//!   provider catalog, and history persistence.
//! - [`api`] defines the wire payloads for both backend protocols
//!   (OpenAI-compatible and local Ollama-style), the normalization of their
//!   responses into one outcome type, and the dispatch client that performs
//!   the network exchange.
//! - [`commands`] implements slash-command parsing and execution used by the
//!   chat loop.
//! - [`ui`] runs the line-oriented chat loop that drives user input and
//!   applies dispatch completions.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod commands;
pub mod core;
pub mod ui;
pub mod utils;
