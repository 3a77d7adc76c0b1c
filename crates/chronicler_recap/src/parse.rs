//! Line-oriented reconstruction of rendered recaps.

use crate::render::ENTRIES_HEADING;
use chronicler_core::{RecapEntry, RecapRecord};
use regex::Regex;
use std::sync::LazyLock;

static ENTRY_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^---\s*Entry\s+\d+:").expect("Valid entry separator regex"));

static ENTRY_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^---\s*Entry\s+\d+:\s*(.+?)\s*---").expect("Valid entry name regex")
});

static BANNER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^=+$").expect("Valid banner regex"));

const SCENE_PREFIX: &str = "Scene: ";
const TYPE_PREFIX: &str = "Type: ";
const KEYWORDS_PREFIX: &str = "Keywords: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Header,
    Entries,
}

/// Accumulates lines of a rendered recap into a record.
#[derive(Debug)]
struct RenderedParser {
    section: Section,
    record: RecapRecord,
    recap_lines: Vec<String>,
    entry: Option<RecapEntry>,
    content_lines: Vec<String>,
}

impl RenderedParser {
    fn new() -> Self {
        Self {
            section: Section::Header,
            record: RecapRecord::default(),
            recap_lines: Vec::new(),
            entry: None,
            content_lines: Vec::new(),
        }
    }

    fn feed(&mut self, line: &str) {
        if let Some(name) = line.strip_prefix(SCENE_PREFIX) {
            self.record.set_scene_name(name.trim());
            return;
        }

        if line.contains(ENTRIES_HEADING) {
            self.commit_recap();
            self.section = Section::Entries;
            return;
        }

        if ENTRY_SEPARATOR.is_match(line) {
            self.commit_entry();
            let name = ENTRY_NAME
                .captures(line)
                .and_then(|caps| caps.get(1))
                .map_or("Unnamed", |m| m.as_str());
            self.entry = Some(RecapEntry::new(name, ""));
            return;
        }

        if self.section == Section::Entries
            && let Some(entry) = self.entry.as_mut()
        {
            if let Some(entry_type) = line.strip_prefix(TYPE_PREFIX) {
                entry.set_entry_type(entry_type.trim());
                return;
            }
            if let Some(keywords) = line.strip_prefix(KEYWORDS_PREFIX) {
                entry.set_keywords(keywords.split(','));
                return;
            }
        }

        if BANNER.is_match(line) || line.trim().is_empty() {
            // Keep paragraph breaks inside a body, drop leading blanks.
            if self.section == Section::Header && !self.recap_lines.is_empty() {
                self.recap_lines.push(String::new());
            } else if self.entry.is_some() && !self.content_lines.is_empty() {
                self.content_lines.push(String::new());
            }
            return;
        }

        if self.section == Section::Header {
            self.recap_lines.push(line.to_string());
        } else if self.entry.is_some() {
            self.content_lines.push(line.to_string());
        }
    }

    fn commit_recap(&mut self) {
        if !self.recap_lines.is_empty() {
            self.record.set_recap(self.recap_lines.join("\n").trim());
            self.recap_lines.clear();
        }
    }

    fn commit_entry(&mut self) {
        if let Some(mut entry) = self.entry.take() {
            if !self.content_lines.is_empty() {
                entry.set_content(self.content_lines.join("\n").trim());
            }
            self.record.push_entry(entry);
        }
        self.content_lines.clear();
    }

    fn finish(mut self) -> RecapRecord {
        self.commit_entry();
        if !self.recap_lines.is_empty() && self.record.recap().is_empty() {
            self.commit_recap();
        }
        self.record
    }
}

/// Rebuild a record from its rendered text form.
///
/// Lines that match no known label are treated as body text of the current
/// section, so arbitrary text ends up as the recap body.
pub fn parse_rendered(text: &str) -> RecapRecord {
    let mut parser = RenderedParser::new();
    for line in text.trim().lines() {
        parser.feed(line);
    }
    parser.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_becomes_recap() {
        let record = parse_rendered("First paragraph.\n\nSecond paragraph.");
        assert_eq!(record.recap(), "First paragraph.\n\nSecond paragraph.");
        assert!(record.entries().is_empty());
        assert!(record.scene_name().is_empty());
    }

    #[test]
    fn entry_without_type_defaults_to_character() {
        let text = "LOREBOOK ENTRIES\n--- Entry 1: Harbor ---\nKeywords: harbor, , docks, harbor\nSalt and tar.";
        let record = parse_rendered(text);
        let entry = &record.entries()[0];
        assert_eq!(entry.name(), "Harbor");
        assert_eq!(entry.entry_type(), "character");
        assert_eq!(entry.keywords(), &vec!["harbor".to_string(), "docks".to_string()]);
        assert_eq!(entry.content(), "Salt and tar.");
    }

    #[test]
    fn metadata_lines_outside_entries_are_body_text() {
        let record = parse_rendered("Type: not metadata");
        assert_eq!(record.recap(), "Type: not metadata");
    }

    #[test]
    fn unnamed_separator() {
        let record = parse_rendered("LOREBOOK ENTRIES\n--- Entry 3:");
        assert_eq!(record.entries()[0].name(), "Unnamed");
    }
}
