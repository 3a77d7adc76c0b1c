//! Change notifications emitted by the scheduler.

use chronicler_core::{OperationId, OperationKind};
use std::sync::Arc;
use std::time::Duration;

/// Something changed in the queue.
#[derive(Debug, Clone, PartialEq, derive_more::Display)]
pub enum QueueEvent {
    /// An operation was added
    #[display("enqueued {} ({})", id, kind)]
    Enqueued {
        /// New operation
        id: OperationId,
        /// Its kind
        kind: OperationKind,
    },
    /// The worker dispatched an operation
    #[display("started {}", _0)]
    Started(OperationId),
    /// An attempt failed transiently and will be retried
    #[display("retrying {} (attempt {}) in {:?}", id, attempt, delay)]
    Retrying {
        /// Operation being retried
        id: OperationId,
        /// Number of failed attempts so far
        attempt: u32,
        /// Backoff before the next attempt
        delay: Duration,
        /// Failure message
        error: String,
    },
    /// The queue was paused while the operation was backing off
    #[display("requeued {}", _0)]
    Requeued(OperationId),
    /// An operation succeeded and left the queue
    #[display("completed {}", _0)]
    Completed(OperationId),
    /// An operation failed permanently or ran out of retries
    #[display("failed {}: {}", id, error)]
    Failed {
        /// Failed operation
        id: OperationId,
        /// Final failure message
        error: String,
        /// Whether it was kept with status `failed`
        retained: bool,
    },
    /// An operation was removed by a caller
    #[display("removed {}", _0)]
    Removed(OperationId),
    /// Operations were removed in bulk
    #[display("cleared {} operations", _0)]
    Cleared(usize),
    /// Dispatch was suspended
    #[display("paused")]
    Paused,
    /// Dispatch was resumed
    #[display("resumed")]
    Resumed,
    /// Operation metadata or flags changed
    #[display("updated {}", _0)]
    Updated(OperationId),
}

/// Callback registered with [`OperationQueue::on_update`](crate::OperationQueue::on_update).
pub type QueueListener = Arc<dyn Fn(&QueueEvent) + Send + Sync>;
