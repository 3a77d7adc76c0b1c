//! Checkpoint and branch transactions for the Chronicler recap pipeline.
//!
//! Creating a checkpoint or branch gives it a private copy of the chat's
//! knowledge store. [`CheckpointManager`] does this as a guarded
//! transaction:
//!
//! - only one transaction runs at a time ([`SingleFlight`])
//! - the store is cloned without pipeline bookkeeping entries
//! - the chat is checked for drift after the host call
//! - the chat's own metadata is always put back afterwards
//!
//! The host application is reached through [`SessionHost`] and [`LoreStore`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod clone;
mod config;
mod host;
mod lock;
mod manager;
mod metadata;

pub use clone::clone_store;
pub use config::{SessionConfig, SessionConfigBuilder};
pub use host::{LoreStore, MessageRef, SessionHost};
pub use lock::{SingleFlight, SingleFlightGuard};
pub use manager::{BranchResult, CheckpointManager, CheckpointResult};
pub use metadata::{MetadataSnapshot, SharedSessionMetadata};
