//! Per-chat session metadata touched by checkpoint and branch transactions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Session metadata owned by the host.
///
/// Only the two keys the transaction guard stages are typed. Everything else
/// the host stores is carried through `extra` untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
    /// Name of the knowledge store attached to the chat
    #[serde(
        default,
        rename = "world_info",
        skip_serializing_if = "Option::is_none"
    )]
    pub knowledge_store_ref: Option<String>,
    /// Marker written while a checkpoint or branch is being created
    #[serde(
        default,
        rename = "auto_recap_checkpoint_state",
        skip_serializing_if = "Option::is_none"
    )]
    pub checkpoint_state: Option<CheckpointState>,
    /// Host-owned keys
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SessionMetadata {
    /// Metadata attached to `store`.
    pub fn with_store(store: impl Into<String>) -> Self {
        Self {
            knowledge_store_ref: Some(store.into()),
            ..Self::default()
        }
    }
}

/// Provenance recorded on a checkpoint or branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct CheckpointState {
    /// When the transaction staged this state
    #[serde(with = "chrono::serde::ts_milliseconds")]
    created_at: DateTime<Utc>,
    /// Whether the knowledge store was cloned for this checkpoint
    #[serde(rename = "lorebook_cloned")]
    store_was_cloned: bool,
    /// Store that was attached before the clone
    #[serde(rename = "original_lorebook", default)]
    original_store_ref: Option<String>,
    /// Set for branches
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    is_branch: bool,
}

impl CheckpointState {
    /// State for a checkpoint or branch created at `created_at`.
    pub fn new(
        created_at: DateTime<Utc>,
        store_was_cloned: bool,
        original_store_ref: Option<String>,
        is_branch: bool,
    ) -> Self {
        Self {
            created_at,
            store_was_cloned,
            original_store_ref,
            is_branch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn host_keys_survive_round_trip() {
        let raw = json!({
            "world_info": "Lore",
            "note_prompt": "keep",
            "auto_recap_checkpoint_state": {
                "created_at": 1700000000000_i64,
                "lorebook_cloned": true,
                "original_lorebook": "Lore"
            }
        });
        let meta: SessionMetadata = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(meta.knowledge_store_ref.as_deref(), Some("Lore"));
        assert_eq!(meta.extra.get("note_prompt"), Some(&json!("keep")));
        let state = meta.checkpoint_state.as_ref().unwrap();
        assert!(*state.store_was_cloned());
        assert!(!*state.is_branch());
        assert_eq!(serde_json::to_value(&meta).unwrap(), raw);
    }
}
