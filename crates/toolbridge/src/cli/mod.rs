//! Command-line interface module.
//!
//! This module provides the CLI structure and command handlers for the toolbridge binary.

mod bridge;
mod chat;
mod commands;
mod config;

pub use bridge::{handle_call, handle_health, handle_metrics, handle_tools};
pub use chat::handle_chat;
pub use commands::{Cli, Commands};
pub use config::load_config;
