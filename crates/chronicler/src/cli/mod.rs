//! Command-line interface module.
//!
//! This module provides the CLI structure and command handlers for the chronicler binary.

mod commands;
mod config;
mod queue;
mod recap;

pub use commands::{Cli, Commands};
pub use config::handle_config_command;
pub use queue::handle_queue_command;
pub use recap::handle_recap_command;
