//! Chronicler - scheduling and bookkeeping for LLM chat recap pipelines
//!
//! Chronicler provides the plumbing behind an automatic recap pipeline for
//! long-running chat sessions:
//!
//! - **Operation scheduler**: persistent priority queue with retry, pause and
//!   bulk cancellation ([`OperationQueue`])
//! - **Checkpoint transactions**: checkpoints and branches that get their own
//!   copy of the chat's knowledge store ([`CheckpointManager`])
//! - **Recap codec**: compact JSON and labelled text forms of a scene recap
//!   ([`encode`], [`decode`])
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use chronicler::{
//!     ChroniclerConfig, EnqueueOptions, JsonFileQueueStore, OperationKind, OperationQueue,
//!     handler_fn, init_logging,
//! };
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ChroniclerConfig::load()?;
//!     init_logging(config.logging())?;
//!
//!     let store = Arc::new(JsonFileQueueStore::new("queue.json"));
//!     let queue = OperationQueue::open(config.queue().clone(), store).await?;
//!     queue.register_handler(
//!         OperationKind::DetectSceneBreak,
//!         handler_fn(|_op| async { Ok(json!({ "scene_break": false })) }),
//!     );
//!     queue
//!         .enqueue(OperationKind::DetectSceneBreak, json!({ "index": 4 }), EnqueueOptions::default())
//!         .await;
//!     queue.wait_until_idle().await;
//!     Ok(())
//! }
//! ```
//!
//! # Cargo Features
//!
//! - `observability` - export tracing spans through OpenTelemetry
//!
//! # Architecture
//!
//! - `chronicler_error` - Error types
//! - `chronicler_core` - Operations, queue snapshots, recap records, session metadata
//! - `chronicler_recap` - Recap codec
//! - `chronicler_queue` - Operation scheduler
//! - `chronicler_session` - Checkpoint and branch transactions
//!
//! This crate (`chronicler`) re-exports everything for convenience.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod logging;

pub use config::{ChroniclerConfig, ChroniclerConfigBuilder, DEFAULT_CONFIG, LoggingConfig, LoggingConfigBuilder};
pub use logging::init_logging;

// Re-export error types
pub use chronicler_error::*;

// Re-export core types
pub use chronicler_core::*;

// Re-export recap codec
pub use chronicler_recap::{
    ENTRIES_HEADING, SEPARATOR_WIDTH, compact, decode, encode, encode_compact, extract_entries,
    extract_recap_text, parse_rendered,
};

// Re-export scheduler
pub use chronicler_queue::*;

// Re-export transaction guard
pub use chronicler_session::*;
