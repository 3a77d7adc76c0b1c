//! CLI command definitions.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Chronicler - scheduling and bookkeeping for LLM chat recap pipelines
#[derive(Parser, Debug)]
#[command(name = "chronicler")]
#[command(about = "Scheduling and bookkeeping for LLM chat recap pipelines", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Recap conversion commands
    #[command(subcommand)]
    Recap(RecapCommands),

    /// Operation queue commands
    Queue(QueueArgs),

    /// Configuration commands
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Recap conversion subcommands
#[derive(Subcommand, Debug)]
pub enum RecapCommands {
    /// Render a recap as labelled text
    Format {
        /// Recap file (stdin when omitted)
        file: Option<PathBuf>,
    },

    /// Convert a recap to single-line JSON
    Compact {
        /// Recap file (stdin when omitted)
        file: Option<PathBuf>,
    },

    /// Print one part of a recap
    Extract {
        /// Part to print
        #[arg(long, value_enum, default_value = "recap")]
        field: RecapField,

        /// Recap file (stdin when omitted)
        file: Option<PathBuf>,
    },
}

/// Recap parts that can be extracted
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecapField {
    /// Recap text
    Recap,
    /// Knowledge entries as JSON
    Entries,
}

/// Operation queue arguments
#[derive(Args, Debug)]
pub struct QueueArgs {
    /// Queue file (defaults to queue.store_path from the configuration)
    #[arg(long, global = true)]
    pub path: Option<PathBuf>,

    /// Queue command
    #[command(subcommand)]
    pub command: QueueCommands,
}

/// Operation queue subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum QueueCommands {
    /// Show operation counts by status
    Stats,
    /// List queued operations in dispatch order
    List {
        /// Only show operations of this kind, e.g. generate_scene_recap
        #[arg(long)]
        kind: Option<String>,
    },
    /// Mark the queue paused
    Pause,
    /// Mark the queue running
    Resume,
    /// Remove every operation
    Clear,
}

/// Configuration subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the resolved configuration as TOML
    Show,
}
