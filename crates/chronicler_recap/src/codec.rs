//! Public codec entry points.

use crate::parse::parse_rendered;
use chronicler_core::{RecapEntry, RecapRecord};
use chronicler_error::JsonError;
use tracing::debug;

pub use crate::render::encode;

/// Serialize a record as compact JSON.
pub fn encode_compact(record: &RecapRecord) -> Result<String, JsonError> {
    serde_json::to_string(record)
        .map_err(|e| JsonError::new(format!("Failed to serialize recap: {}", e)))
}

/// Normalize compact JSON or rendered text into a record.
///
/// A JSON object is tried first. Anything else, including JSON that is not an
/// object or does not fit the record shape, is parsed as rendered text. This
/// never fails: unrecognised text comes back as the recap body.
///
/// ```
/// use chronicler_recap::decode;
///
/// let record = decode(r#"{"scene_name":"Harbor","recap":"They sail.","setting_lore":[]}"#);
/// assert_eq!(record.scene_name(), "Harbor");
///
/// let record = decode("Just some words.");
/// assert_eq!(record.recap(), "Just some words.");
/// ```
pub fn decode(text: &str) -> RecapRecord {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return RecapRecord::default();
    }

    if let Some(record) = decode_json(trimmed) {
        return record;
    }

    parse_rendered(trimmed)
}

fn decode_json(text: &str) -> Option<RecapRecord> {
    let value: serde_json::Value = serde_json::from_str(text).ok()?;
    if !value.is_object() {
        return None;
    }
    match serde_json::from_value(value) {
        Ok(record) => Some(record),
        Err(e) => {
            debug!(error = %e, "JSON object does not match recap shape, parsing as rendered text");
            None
        }
    }
}

/// Re-encode either form as compact JSON.
///
/// Falls back to the input text if serialization fails.
pub fn compact(text: &str) -> String {
    encode_compact(&decode(text)).unwrap_or_else(|e| {
        debug!(error = %e, "Failed to compact recap");
        text.to_string()
    })
}

/// The recap body of either form.
pub fn extract_recap_text(text: &str) -> String {
    decode(text).recap().clone()
}

/// The knowledge entries of either form.
pub fn extract_entries(text: &str) -> Vec<RecapEntry> {
    decode(text).into_entries()
}
