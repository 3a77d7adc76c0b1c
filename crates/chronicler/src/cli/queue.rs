//! Operation queue command handlers.
//!
//! These edit the persisted snapshot directly. Run them while no worker has
//! the same file open, or the worker will overwrite the change on its next
//! save.

use super::commands::{QueueArgs, QueueCommands};
use chronicler::{
    ChroniclerConfig, ChroniclerError, ChroniclerResult, ConfigError,
    JsonFileQueueStore, Operation, OperationKind, QueueError, QueueErrorKind, QueueStore,
};
use std::cmp::Reverse;
use tracing::info;

/// Handle queue subcommands.
pub async fn handle_queue_command(args: QueueArgs, config: &ChroniclerConfig) -> ChroniclerResult<()> {
    let path = args
        .path
        .or_else(|| config.queue().store_path().clone())
        .ok_or_else(|| {
            ChroniclerError::from(ConfigError::missing_key(
                "queue.store_path",
                "pass --path or set it in chronicler.toml",
            ))
        })?;
    let store = JsonFileQueueStore::new(path);
    println!("{}", run(args.command, &store).await?);
    Ok(())
}

async fn run(command: QueueCommands, store: &dyn QueueStore) -> ChroniclerResult<String> {
    let mut snapshot = store.load().await?.unwrap_or_default();

    let output = match command {
        QueueCommands::Stats => snapshot.stats().to_string(),
        QueueCommands::List { kind } => {
            let kind = kind.as_deref().map(parse_kind).transpose()?;
            let mut operations: Vec<&Operation> = snapshot
                .operations
                .iter()
                .filter(|op| kind.is_none_or(|kind| *op.kind() == kind))
                .collect();
            operations.sort_by_key(|op| (Reverse(*op.priority()), *op.sequence()));
            if operations.is_empty() {
                "Queue is empty".to_string()
            } else {
                operations
                    .iter()
                    .map(|op| describe(op))
                    .collect::<Vec<_>>()
                    .join("\n")
            }
        }
        QueueCommands::Pause => {
            snapshot.paused = true;
            store.save(&snapshot).await?;
            info!("Queue marked paused");
            "Queue paused".to_string()
        }
        QueueCommands::Resume => {
            snapshot.paused = false;
            store.save(&snapshot).await?;
            info!("Queue marked running");
            "Queue resumed".to_string()
        }
        QueueCommands::Clear => {
            let count = snapshot.clear();
            store.save(&snapshot).await?;
            info!(count, "Queue cleared");
            format!("Cleared {} operations", count)
        }
    };
    Ok(output)
}

fn parse_kind(tag: &str) -> Result<OperationKind, QueueError> {
    tag.trim()
        .parse()
        .map_err(|_| QueueError::new(QueueErrorKind::UnknownKind(tag.to_string())))
}

fn describe(op: &Operation) -> String {
    let mut line = format!(
        "{}  {}  {}  priority={}  retries={}",
        op.id(),
        op.kind(),
        op.status(),
        op.priority(),
        op.retries()
    );
    if !op.depends_on().is_empty() {
        let deps: Vec<&str> = op.depends_on().iter().map(|id| id.as_str()).collect();
        line.push_str(&format!("  after={}", deps.join(",")));
    }
    if *op.pause_before() {
        line.push_str("  [pause before]");
    }
    if let Some(error) = op.error() {
        line.push_str(&format!("  error={}", error));
    }
    line
}
