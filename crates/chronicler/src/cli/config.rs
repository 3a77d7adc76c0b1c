//! Configuration command handlers.

use super::commands::ConfigCommands;
use chronicler::{ChroniclerConfig, ChroniclerResult};

/// Handle config subcommands.
pub fn handle_config_command(command: ConfigCommands, config: &ChroniclerConfig) -> ChroniclerResult<()> {
    match command {
        ConfigCommands::Show => print!("{}", config.to_toml()?),
    }
    Ok(())
}
