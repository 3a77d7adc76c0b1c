//! Structured scene recap records.

use serde::{Deserialize, Deserializer, Serialize};

/// Entry type assumed when the rendered form omits one.
pub const DEFAULT_ENTRY_TYPE: &str = "character";

/// A scene recap with the knowledge entries extracted from it.
///
/// The JSON form matches what the pipeline persists: entries live under
/// `setting_lore` (`entries` is accepted on input).
///
/// # Examples
///
/// ```
/// use chronicler_core::{RecapEntry, RecapRecord};
///
/// let record = RecapRecord::new("The Docks", "Mira meets the smuggler.")
///     .with_entry(RecapEntry::new("Mira", "Dockhand with a secret.").with_keywords(["mira", "dockhand"]));
/// assert_eq!(record.entries().len(), 1);
/// assert_eq!(record.entries()[0].entry_type(), "character");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct RecapRecord {
    /// Scene title
    #[serde(default)]
    scene_name: String,
    /// Narrative recap body
    #[serde(default)]
    recap: String,
    /// Extracted knowledge entries
    #[serde(default, rename = "setting_lore", alias = "entries")]
    entries: Vec<RecapEntry>,
}

impl RecapRecord {
    /// Create a record without entries.
    pub fn new(scene_name: impl Into<String>, recap: impl Into<String>) -> Self {
        Self {
            scene_name: scene_name.into(),
            recap: recap.into(),
            entries: Vec::new(),
        }
    }

    /// Record holding only a recap body.
    pub fn from_recap(recap: impl Into<String>) -> Self {
        Self::new(String::new(), recap)
    }

    /// Append an entry.
    pub fn with_entry(mut self, entry: RecapEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Mutable access for incremental construction.
    pub fn set_scene_name(&mut self, name: impl Into<String>) {
        self.scene_name = name.into();
    }

    /// Replace the recap body.
    pub fn set_recap(&mut self, recap: impl Into<String>) {
        self.recap = recap.into();
    }

    /// Append an entry in place.
    pub fn push_entry(&mut self, entry: RecapEntry) {
        self.entries.push(entry);
    }

    /// Consume the record, returning its entries.
    pub fn into_entries(self) -> Vec<RecapEntry> {
        self.entries
    }
}

/// One knowledge entry extracted from a scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct RecapEntry {
    /// Entry category (character, location, item, ...)
    #[serde(rename = "type", default = "default_entry_type")]
    entry_type: String,
    /// Display name
    #[serde(default, alias = "comment")]
    name: String,
    /// Entry body
    #[serde(default)]
    content: String,
    /// Activation keywords, deduplicated in first-seen order
    #[serde(default, deserialize_with = "deserialize_keywords")]
    keywords: Vec<String>,
    /// Knowledge-store uid when the entry is already persisted
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_uid"
    )]
    uid: Option<String>,
}

fn default_entry_type() -> String {
    DEFAULT_ENTRY_TYPE.to_string()
}

impl Default for RecapEntry {
    fn default() -> Self {
        Self {
            entry_type: default_entry_type(),
            name: String::new(),
            content: String::new(),
            keywords: Vec::new(),
            uid: None,
        }
    }
}

impl RecapEntry {
    /// Create an entry of the default type.
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    /// Set the entry type.
    pub fn with_type(mut self, entry_type: impl Into<String>) -> Self {
        self.entry_type = entry_type.into();
        self
    }

    /// Replace the keywords, dropping blanks and repeats.
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_keywords(keywords);
        self
    }

    /// Set the knowledge-store uid.
    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    /// Replace the entry type in place.
    pub fn set_entry_type(&mut self, entry_type: impl Into<String>) {
        self.entry_type = entry_type.into();
    }

    /// Replace the body in place.
    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }

    /// Replace the keywords in place, dropping blanks and repeats.
    pub fn set_keywords<I, S>(&mut self, keywords: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = dedup_keywords(keywords.into_iter().map(Into::into));
    }

    /// Name shown in rendered output.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            "Unnamed"
        } else {
            &self.name
        }
    }
}

fn dedup_keywords(keywords: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = Vec::new();
    for keyword in keywords {
        let keyword = keyword.trim();
        if !keyword.is_empty() && !seen.iter().any(|k: &String| k == keyword) {
            seen.push(keyword.to_string());
        }
    }
    seen
}

fn deserialize_keywords<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<String>>::deserialize(deserializer)?;
    Ok(dedup_keywords(raw.unwrap_or_default().into_iter()))
}

fn deserialize_uid<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Uid {
        Text(String),
        Number(i64),
    }

    Ok(Option::<Uid>::deserialize(deserializer)?.map(|uid| match uid {
        Uid::Text(text) => text,
        Uid::Number(n) => n.to_string(),
    }))
}
