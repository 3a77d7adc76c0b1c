//! Core data types for the Chronicler recap pipeline.
//!
//! This crate provides the data model shared by the scheduler, the session
//! transaction guard and the recap codec: operations and their persisted queue,
//! recap records, session metadata and knowledge-store (lorebook) entries.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod lore;
mod operation;
mod queue;
mod recap;
mod session;

pub use lore::{INTERNAL_ENTRY_PREFIXES, LoreBook, LoreEntry, is_internal_entry};
pub use operation::{EnqueueOptions, Operation, OperationId, OperationKind, OperationStatus};
pub use queue::{QUEUE_FORMAT_VERSION, QueueSnapshot, QueueStats};
pub use recap::{DEFAULT_ENTRY_TYPE, RecapEntry, RecapRecord};
pub use session::{CheckpointState, SessionMetadata};
