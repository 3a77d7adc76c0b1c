//! Persisted queue state and derived statistics.

use crate::{Operation, OperationId, OperationStatus};
use serde::{Deserialize, Serialize};

/// Format version written into every persisted snapshot.
pub const QUEUE_FORMAT_VERSION: u32 = 1;

/// Everything the scheduler persists between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    /// Operations in enqueue order
    #[serde(default, rename = "queue")]
    pub operations: Vec<Operation>,
    /// Whether dispatch is suspended
    #[serde(default)]
    pub paused: bool,
    /// Snapshot format version
    #[serde(default = "default_version")]
    pub version: u32,
    /// Bumped by `clear_all`; in-flight results from older generations are discarded
    #[serde(default, rename = "queue_version")]
    pub generation: u64,
    /// Next enqueue sequence number
    #[serde(default)]
    pub next_sequence: u64,
    /// Operation the worker was running when the snapshot was taken
    #[serde(default, rename = "current_operation_id")]
    pub current_operation_id: Option<OperationId>,
}

fn default_version() -> u32 {
    QUEUE_FORMAT_VERSION
}

impl Default for QueueSnapshot {
    fn default() -> Self {
        Self {
            operations: Vec::new(),
            paused: false,
            version: QUEUE_FORMAT_VERSION,
            generation: 0,
            next_sequence: 0,
            current_operation_id: None,
        }
    }
}

impl QueueSnapshot {
    /// Prepare a freshly loaded snapshot for a new worker.
    ///
    /// Nothing can be running right after a load, so stale `in_progress`
    /// operations go back to `pending` and the current operation is cleared.
    /// The sequence counter is raised above every stored operation. Returns the
    /// number of operations that were reset.
    pub fn recover(&mut self) -> usize {
        let mut reset = 0;
        for op in &mut self.operations {
            if *op.status() == OperationStatus::InProgress {
                op.reset_to_pending();
                reset += 1;
            }
        }
        self.current_operation_id = None;
        let max_sequence = self
            .operations
            .iter()
            .map(|op| *op.sequence() + 1)
            .max()
            .unwrap_or(0);
        self.next_sequence = self.next_sequence.max(max_sequence);
        reset
    }

    /// Drop every operation and start a new generation. Returns the number
    /// removed.
    pub fn clear(&mut self) -> usize {
        let count = self.operations.len();
        self.operations.clear();
        self.generation += 1;
        self.current_operation_id = None;
        count
    }

    /// Statistics for the current operations.
    pub fn stats(&self) -> QueueStats {
        QueueStats::from_operations(&self.operations, self.paused)
    }
}

/// Counts of operations per status.
///
/// `total` always equals the sum of the four status counts.
///
/// # Examples
///
/// ```
/// use chronicler_core::QueueStats;
///
/// let stats = QueueStats::from_operations(&[], true);
/// assert_eq!(stats.total, 0);
/// assert!(stats.paused);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Waiting for dispatch
    pub pending: usize,
    /// Running or backing off
    pub in_progress: usize,
    /// Succeeded and not yet removed
    pub completed: usize,
    /// Retained failures
    pub failed: usize,
    /// Sum of the above
    pub total: usize,
    /// Whether dispatch is suspended
    pub paused: bool,
}

impl QueueStats {
    /// Count operations by status.
    pub fn from_operations(operations: &[Operation], paused: bool) -> Self {
        let mut stats = Self {
            paused,
            ..Self::default()
        };
        for op in operations {
            match op.status() {
                OperationStatus::Pending => stats.pending += 1,
                OperationStatus::InProgress => stats.in_progress += 1,
                OperationStatus::Completed => stats.completed += 1,
                OperationStatus::Failed => stats.failed += 1,
            }
        }
        stats.total = stats.pending + stats.in_progress + stats.completed + stats.failed;
        stats
    }
}

impl std::fmt::Display for QueueStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "pending={} in_progress={} completed={} failed={} total={}{}",
            self.pending,
            self.in_progress,
            self.completed,
            self.failed,
            self.total,
            if self.paused { " (paused)" } else { "" }
        )
    }
}
