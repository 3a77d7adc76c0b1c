//! Persistent priority scheduler for pipeline operations.
//!
//! Pipeline stages enqueue [`Operation`](chronicler_core::Operation)s; a single
//! worker task dispatches them to registered [`OperationHandler`]s in priority
//! order, retrying transient failures with exponential backoff and dropping
//! permanent ones. The queue survives restarts through a [`QueueStore`].
//!
//! # Example
//!
//! ```no_run
//! use chronicler_core::{EnqueueOptions, OperationKind};
//! use chronicler_error::HandlerError;
//! use chronicler_queue::{JsonFileQueueStore, OperationQueue, QueueConfig, handler_fn};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(JsonFileQueueStore::new("queue.json"));
//! let queue = OperationQueue::open(QueueConfig::default(), store).await?;
//!
//! queue.register_handler(
//!     OperationKind::GenerateSceneRecap,
//!     handler_fn(|op| async move {
//!         let index = op.payload()["index"]
//!             .as_u64()
//!             .ok_or_else(|| HandlerError::permanent("missing index"))?;
//!         Ok::<_, HandlerError>(json!({ "recap": format!("scene ending at {}", index) }))
//!     }),
//! );
//! queue.start().await;
//!
//! queue
//!     .enqueue(
//!         OperationKind::GenerateSceneRecap,
//!         json!({ "index": 12 }),
//!         EnqueueOptions::default().with_priority(20),
//!     )
//!     .await;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod event;
mod handler;
mod queue;
mod retry;
mod store;

pub use config::{QueueConfig, QueueConfigBuilder};
pub use event::{QueueEvent, QueueListener};
pub use handler::{HandlerFn, HandlerRegistry, HandlerResult, OperationHandler, handler_fn};
pub use queue::OperationQueue;
pub use retry::{RetryPolicy, RetryPolicyBuilder};
pub use store::{JsonFileQueueStore, MemoryQueueStore, QueueStore};
