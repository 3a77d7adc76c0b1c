//! Operations scheduled by the recap pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque operation identifier.
///
/// Generated identifiers look like `op_1718000000000_k3j9x0a1b`: the enqueue
/// time in unix milliseconds followed by nine lowercase alphanumerics.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
)]
#[serde(transparent)]
pub struct OperationId(String);

impl OperationId {
    /// Generate a fresh identifier stamped with `now`.
    pub fn generate(now: DateTime<Utc>) -> Self {
        let random = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("op_{}_{}", now.timestamp_millis(), &random[..9]))
    }

    /// Borrow the identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for OperationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl AsRef<str> for OperationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Closed set of pipeline stages the scheduler can dispatch.
///
/// The serialized tag is the snake_case name, except for
/// [`OperationKind::CompactLorebookEntry`] which keeps its historical tag.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OperationKind {
    /// Check a generated recap against the validation prompt
    ValidateRecap,
    /// Look for a scene break at a message
    DetectSceneBreak,
    /// Scan backwards for the previous scene break
    DetectSceneBreakBackwards,
    /// Generate the recap for a finished scene
    GenerateSceneRecap,
    /// Reorganize a scene recap into sections
    OrganizeSceneRecap,
    /// Parse a scene recap into a structured record
    ParseSceneRecap,
    /// Filter setting lore out of a scene recap
    FilterSceneRecapSl,
    /// Regenerate the running recap
    GenerateRunningRecap,
    /// Fold a scene recap into the running recap
    CombineSceneWithRunning,
    /// Find existing knowledge entries matching an extracted entry
    LorebookEntryLookup,
    /// Decide whether an extracted entry is new or a duplicate
    ResolveLorebookEntry,
    /// Create a knowledge entry
    CreateLorebookEntry,
    /// Merge an extracted entry into an existing one
    MergeLorebookEntry,
    /// Compact an oversized knowledge entry
    #[serde(rename = "auto_lorebooks_recap_lorebook_entry_compaction")]
    #[strum(serialize = "auto_lorebooks_recap_lorebook_entry_compaction")]
    CompactLorebookEntry,
    /// Rebuild category registries
    PopulateRegistries,
    /// Update a category registry entry
    UpdateLorebookRegistry,
    /// Record a knowledge-store snapshot
    UpdateLorebookSnapshot,
    /// Forward a chat generation
    Chat,
}

impl OperationKind {
    /// Whether dispatching this kind sends a request to the model provider.
    ///
    /// Bookkeeping kinds skip the inter-dispatch delay.
    pub fn calls_model(&self) -> bool {
        !matches!(
            self,
            OperationKind::UpdateLorebookRegistry | OperationKind::UpdateLorebookSnapshot
        )
    }
}

/// Lifecycle state of an operation.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OperationStatus {
    /// Waiting for dispatch
    #[default]
    Pending,
    /// Handler is running or backing off between attempts
    InProgress,
    /// Handler succeeded
    Completed,
    /// Handler failed permanently or exhausted its retries
    Failed,
}

impl OperationStatus {
    /// Completed and failed operations never run again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OperationStatus::Completed | OperationStatus::Failed)
    }
}

/// Caller-supplied knobs for [`Operation::new`].
///
/// # Examples
///
/// ```
/// use chronicler_core::EnqueueOptions;
///
/// let opts = EnqueueOptions::default()
///     .with_priority(10)
///     .with_pause_before(true);
/// assert_eq!(*opts.priority(), 10);
/// assert!(opts.depends_on().is_empty());
/// ```
#[derive(
    Debug,
    Clone,
    Default,
    PartialEq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_setters::Setters,
)]
#[setters(prefix = "with_")]
pub struct EnqueueOptions {
    /// Higher values dispatch first
    #[serde(default)]
    priority: i64,
    /// Operations that must leave the queue before this one may run
    #[serde(default)]
    depends_on: Vec<OperationId>,
    /// Free-form metadata shown alongside the operation
    #[serde(default)]
    metadata: Map<String, Value>,
    /// Pause the queue right before this operation is dispatched
    #[serde(default)]
    pause_before: bool,
}

/// A unit of pipeline work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct Operation {
    /// Unique identifier
    id: OperationId,
    /// Stage to run
    #[serde(rename = "type")]
    kind: OperationKind,
    /// Stage-specific input
    #[serde(default)]
    payload: Value,
    /// Dispatch priority (higher first)
    #[serde(default)]
    priority: i64,
    /// Lifecycle state
    #[serde(default)]
    status: OperationStatus,
    /// Enqueue time
    created_at: DateTime<Utc>,
    /// Enqueue order, breaks priority ties
    #[serde(default)]
    sequence: u64,
    /// Time the current attempt started
    #[serde(default)]
    started_at: Option<DateTime<Utc>>,
    /// Number of failed attempts so far
    #[serde(default)]
    retries: u32,
    /// Operations that must leave the queue first
    #[serde(default, rename = "dependencies")]
    depends_on: Vec<OperationId>,
    /// Free-form metadata
    #[serde(default)]
    metadata: Map<String, Value>,
    /// Pause the queue right before dispatch
    #[serde(default, rename = "pause_before_execution")]
    pause_before: bool,
    /// Last failure message
    #[serde(default)]
    error: Option<String>,
}

impl Operation {
    /// Create a pending operation.
    pub fn new(
        kind: OperationKind,
        payload: Value,
        options: EnqueueOptions,
        sequence: u64,
        now: DateTime<Utc>,
    ) -> Self {
        let EnqueueOptions {
            priority,
            depends_on,
            metadata,
            pause_before,
        } = options;
        Self {
            id: OperationId::generate(now),
            kind,
            payload,
            priority,
            status: OperationStatus::Pending,
            created_at: now,
            sequence,
            started_at: None,
            retries: 0,
            depends_on,
            metadata,
            pause_before,
            error: None,
        }
    }

    /// Whether the operation is waiting for dispatch.
    pub fn is_pending(&self) -> bool {
        self.status == OperationStatus::Pending
    }

    /// Move to `in_progress` and stamp the start time.
    pub fn mark_in_progress(&mut self, now: DateTime<Utc>) {
        self.status = OperationStatus::InProgress;
        self.started_at = Some(now);
    }

    /// Return to `pending`, e.g. after a restart or a pause during backoff.
    pub fn reset_to_pending(&mut self) {
        self.status = OperationStatus::Pending;
        self.started_at = None;
    }

    /// Record a failed attempt that will be retried.
    pub fn record_retry(&mut self, message: impl Into<String>) {
        self.retries += 1;
        self.error = Some(message.into());
    }

    /// Move to `completed`.
    pub fn mark_completed(&mut self) {
        self.status = OperationStatus::Completed;
        self.error = None;
    }

    /// Move to `failed` with the final error message.
    pub fn mark_failed(&mut self, message: impl Into<String>) {
        self.status = OperationStatus::Failed;
        self.error = Some(message.into());
    }

    /// Shallow-merge `patch` into the metadata object.
    pub fn merge_metadata(&mut self, patch: Map<String, Value>) {
        self.metadata.extend(patch);
    }

    /// Flip the pause-before flag and return the new value.
    pub fn toggle_pause_before(&mut self) -> bool {
        self.pause_before = !self.pause_before;
        self.pause_before
    }

    /// Clear the pause-before flag, returning whether it was set.
    pub fn take_pause_before(&mut self) -> bool {
        std::mem::take(&mut self.pause_before)
    }

    /// Drop `id` from the dependency list. Returns true if it was present.
    pub fn remove_dependency(&mut self, id: &OperationId) -> bool {
        let before = self.depends_on.len();
        self.depends_on.retain(|dep| dep != id);
        self.depends_on.len() != before
    }

    /// Replace a dependency on `from` with a dependency on `to`.
    ///
    /// Returns true when the list changed. Duplicates are not introduced.
    pub fn replace_dependency(&mut self, from: &OperationId, to: &OperationId) -> bool {
        if !self.remove_dependency(from) {
            return false;
        }
        if self.id != *to && !self.depends_on.contains(to) {
            self.depends_on.push(to.clone());
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn generated_ids_have_expected_shape() {
        let now = Utc::now();
        let id = OperationId::generate(now);
        let parts: Vec<&str> = id.as_str().splitn(3, '_').collect();
        assert_eq!(parts[0], "op");
        assert_eq!(parts[1], now.timestamp_millis().to_string());
        assert_eq!(parts[2].len(), 9);
        assert!(
            parts[2]
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase())
        );
        assert_ne!(id, OperationId::generate(now));
    }

    #[test]
    fn compaction_kind_keeps_historical_tag() {
        let kind = OperationKind::CompactLorebookEntry;
        assert_eq!(
            kind.to_string(),
            "auto_lorebooks_recap_lorebook_entry_compaction"
        );
        assert_eq!(
            serde_json::to_value(kind).unwrap(),
            Value::String("auto_lorebooks_recap_lorebook_entry_compaction".into())
        );
        assert_eq!(
            OperationKind::from_str("auto_lorebooks_recap_lorebook_entry_compaction").unwrap(),
            kind
        );
        assert_eq!(
            OperationKind::from_str("detect_scene_break").unwrap(),
            OperationKind::DetectSceneBreak
        );
    }

    #[test]
    fn replace_dependency_avoids_duplicates() {
        let mut op = Operation::new(
            OperationKind::Chat,
            Value::Null,
            EnqueueOptions::default().with_depends_on(vec!["a".into(), "b".into()]),
            0,
            Utc::now(),
        );
        assert!(op.replace_dependency(&"a".into(), &"b".into()));
        assert_eq!(op.depends_on(), &vec![OperationId::from("b")]);
        assert!(!op.replace_dependency(&"zzz".into(), &"b".into()));
    }
}
