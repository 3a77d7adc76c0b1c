//! Human-readable recap rendering.

use chronicler_core::RecapRecord;

/// Width of the `=` banner around the entries heading.
pub const SEPARATOR_WIDTH: usize = 60;

/// Heading that opens the knowledge-entries section.
pub const ENTRIES_HEADING: &str = "LOREBOOK ENTRIES";

/// Render a record as labelled text.
///
/// Empty scene names and recap bodies are omitted. The entries section only
/// appears when the record has entries.
pub fn encode(record: &RecapRecord) -> String {
    let mut lines: Vec<String> = Vec::new();

    if !record.scene_name().is_empty() {
        lines.push(format!("Scene: {}", record.scene_name()));
        lines.push(String::new());
    }

    if !record.recap().is_empty() {
        lines.push(record.recap().clone());
    }

    if !record.entries().is_empty() {
        let banner = "=".repeat(SEPARATOR_WIDTH);
        lines.push(String::new());
        lines.push(banner.clone());
        lines.push(ENTRIES_HEADING.to_string());
        lines.push(banner);
        lines.push(String::new());

        for (index, entry) in record.entries().iter().enumerate() {
            lines.push(format!("--- Entry {}: {} ---", index + 1, entry.display_name()));
            lines.push(String::new());
            lines.push(format!("Type: {}", entry.entry_type()));
            lines.push(format!("Keywords: {}", entry.keywords().join(", ")));
            if !entry.content().is_empty() {
                lines.push(String::new());
                lines.push(entry.content().clone());
            }
            lines.push(String::new());
        }
    }

    lines.join("\n")
}
