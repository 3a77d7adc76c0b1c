//! Error types for the Chronicler library.
//!
//! This crate provides the foundation error types used throughout the Chronicler workspace.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! # Examples
//!
//! ```
//! use chronicler_error::{ChroniclerResult, ConfigError};
//!
//! fn load_settings() -> ChroniclerResult<String> {
//!     Err(ConfigError::new("queue.retry.max_retries must be a number"))?
//! }
//!
//! match load_settings() {
//!     Ok(settings) => println!("Got: {}", settings),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod handler;
mod json;
mod queue;
mod session;
mod storage;

pub use config::ConfigError;
pub use error::{ChroniclerError, ChroniclerErrorKind, ChroniclerResult};
pub use handler::{HandlerError, HandlerErrorKind, RetryableError};
pub use json::JsonError;
pub use queue::{QueueError, QueueErrorKind};
pub use session::{SessionError, SessionErrorKind};
pub use storage::{StorageError, StorageErrorKind};
