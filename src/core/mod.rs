pub mod app;
pub mod config;
pub mod conversation;
pub mod engine;
pub mod history;
pub mod message;
pub mod providers;
