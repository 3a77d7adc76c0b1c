//! Scheduler configuration.

use crate::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for [`OperationQueue`](crate::OperationQueue).
///
/// # Examples
///
/// ```
/// use chronicler_queue::{QueueConfig, RetryPolicy};
///
/// let config = QueueConfig::default()
///     .with_retry(RetryPolicy::none())
///     .with_retain_failed(true);
/// assert!(*config.retain_failed());
/// assert_eq!(*config.retry().max_retries(), 0);
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_setters::Setters,
    derive_builder::Builder,
)]
#[setters(prefix = "with_")]
#[builder(default)]
pub struct QueueConfig {
    /// Backoff policy for transient failures
    #[serde(default)]
    retry: RetryPolicy,
    /// Per-attempt handler time budget; unlimited when unset
    #[serde(default)]
    handler_timeout_secs: Option<u64>,
    /// Pause between model-calling operations
    #[serde(default)]
    dispatch_interval_ms: u64,
    /// Keep permanently failed operations with status `failed`
    #[serde(default)]
    retain_failed: bool,
    /// JSON file the queue is persisted to; in memory when unset
    #[serde(default)]
    store_path: Option<PathBuf>,
}

impl QueueConfig {
    /// Handler time budget as a duration.
    pub fn handler_timeout(&self) -> Option<Duration> {
        self.handler_timeout_secs.map(Duration::from_secs)
    }

    /// Dispatch interval as a duration.
    pub fn dispatch_interval(&self) -> Duration {
        Duration::from_millis(self.dispatch_interval_ms)
    }
}
