//! Knowledge-store (lorebook) records as exchanged with the host.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Label prefixes reserved for pipeline bookkeeping entries.
///
/// Entries with these labels hold registries, the persisted queue and running
/// recaps. They belong to the chat they were written for and are never cloned.
pub const INTERNAL_ENTRY_PREFIXES: &[&str] = &[
    "_registry_",
    "__operation_queue",
    "_combined_recap_",
    "_running_scene_recap_",
];

/// Whether `label` starts with one of the default internal prefixes.
///
/// ```
/// use chronicler_core::is_internal_entry;
///
/// assert!(is_internal_entry("_registry_character"));
/// assert!(!is_internal_entry("Mira"));
/// assert!(!is_internal_entry(""));
/// ```
pub fn is_internal_entry(label: &str) -> bool {
    has_prefix(label, INTERNAL_ENTRY_PREFIXES)
}

fn has_prefix<S: AsRef<str>>(label: &str, prefixes: &[S]) -> bool {
    !label.is_empty() && prefixes.iter().any(|p| label.starts_with(p.as_ref()))
}

/// A knowledge store: entries keyed by numeric uid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoreBook {
    /// Entries keyed by uid
    #[serde(default)]
    pub entries: BTreeMap<u64, LoreEntry>,
}

impl LoreBook {
    /// Allocate a blank entry with the next free uid.
    pub fn create_entry(&mut self) -> &mut LoreEntry {
        let uid = self.next_uid();
        self.entries.entry(uid).or_insert_with(|| LoreEntry::new(uid))
    }

    /// Smallest uid greater than every existing one.
    pub fn next_uid(&self) -> u64 {
        self.entries.keys().next_back().map_or(0, |uid| uid + 1)
    }

    /// First entry whose label equals `comment`.
    pub fn find_by_comment(&self, comment: &str) -> Option<&LoreEntry> {
        self.entries.values().find(|entry| entry.comment == comment)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One knowledge-store entry.
///
/// Field names follow the host's camelCase JSON. Attributes the pipeline does
/// not model are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoreEntry {
    /// Store-assigned identifier
    #[serde(default)]
    pub uid: u64,
    /// Entry label
    #[serde(default)]
    pub comment: String,
    /// Entry body
    #[serde(default)]
    pub content: String,
    /// Primary activation keys
    #[serde(default)]
    pub key: Vec<String>,
    /// Secondary activation keys
    #[serde(default, rename = "keysecondary")]
    pub keysecondary: Vec<String>,
    /// Insertion order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    /// Insertion position
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
    /// Insertion depth
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<i64>,
    /// Turns the entry stays active after triggering
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sticky: Option<i64>,
    /// Activation probability in percent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<i64>,
    /// Always active
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constant: Option<bool>,
    /// Disabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable: Option<bool>,
    /// Not activated by other entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_recursion: Option<bool>,
    /// Does not activate other entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prevent_recursion: Option<bool>,
    /// Inserted even when over budget
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_budget: Option<bool>,
    /// Honour `probability`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_probability: Option<bool>,
    /// Message role the entry is inserted as
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<i64>,
    /// Free-form tags
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Host-owned attributes
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LoreEntry {
    /// Blank entry with the given uid.
    pub fn new(uid: u64) -> Self {
        Self {
            uid,
            ..Self::default()
        }
    }

    /// Whether the label starts with one of `prefixes`.
    pub fn is_internal<S: AsRef<str>>(&self, prefixes: &[S]) -> bool {
        has_prefix(&self.comment, prefixes)
    }

    /// Copy the cloneable attributes of `source` onto this entry.
    ///
    /// The uid and host-owned `extra` attributes stay as they are. Optional
    /// attributes missing on the source leave this entry's values untouched.
    pub fn copy_attributes_from(&mut self, source: &LoreEntry) {
        self.comment = source.comment.clone();
        self.content = source.content.clone();
        self.key = source.key.clone();
        self.keysecondary = source.keysecondary.clone();

        for (target, value) in [
            (&mut self.order, source.order),
            (&mut self.position, source.position),
            (&mut self.depth, source.depth),
            (&mut self.sticky, source.sticky),
            (&mut self.probability, source.probability),
            (&mut self.role, source.role),
        ] {
            if value.is_some() {
                *target = value;
            }
        }

        for (target, value) in [
            (&mut self.constant, source.constant),
            (&mut self.disable, source.disable),
            (&mut self.exclude_recursion, source.exclude_recursion),
            (&mut self.prevent_recursion, source.prevent_recursion),
            (&mut self.ignore_budget, source.ignore_budget),
            (&mut self.use_probability, source.use_probability),
        ] {
            if value.is_some() {
                *target = value;
            }
        }

        if let Some(tags) = &source.tags {
            self.tags = Some(tags.clone());
        }
    }
}
