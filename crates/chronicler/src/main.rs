//! Chronicler CLI binary.
//!
//! This binary provides command-line access to Chronicler's functionality:
//! - Convert recaps between compact JSON and labelled text
//! - Inspect and manage a persisted operation queue
//! - Show the resolved configuration

use chronicler::{ChroniclerConfig, init_logging};
use clap::Parser;

mod cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use cli::{Cli, Commands, handle_config_command, handle_queue_command, handle_recap_command};

    // Parse command-line arguments
    let cli = Cli::parse();

    let mut config = ChroniclerConfig::load()?;
    if cli.verbose {
        config = config.clone().with_logging(config.logging().clone().with_level("debug"));
    }
    init_logging(config.logging())?;

    // Execute the requested command
    match cli.command {
        Commands::Recap(recap_cmd) => {
            handle_recap_command(recap_cmd)?;
        }

        Commands::Queue(queue_args) => {
            handle_queue_command(queue_args, &config).await?;
        }

        Commands::Config(config_cmd) => {
            handle_config_command(config_cmd, &config)?;
        }
    }

    Ok(())
}
