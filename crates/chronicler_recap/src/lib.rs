//! Scene recap codec.
//!
//! Recaps travel through the pipeline as compact JSON and are shown to people
//! as a labelled text rendering. This crate converts between the two and
//! normalizes either form back into a [`RecapRecord`].
//!
//! # Example
//!
//! ```
//! use chronicler_core::{RecapEntry, RecapRecord};
//! use chronicler_recap::{decode, encode};
//!
//! let record = RecapRecord::new("The Docks", "Mira meets the smuggler.")
//!     .with_entry(RecapEntry::new("Mira", "Dockhand with a secret."));
//!
//! let text = encode(&record);
//! assert!(text.starts_with("Scene: The Docks"));
//! assert_eq!(decode(&text), record);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod codec;
mod parse;
mod render;

pub use chronicler_core::{RecapEntry, RecapRecord};
pub use codec::{compact, decode, encode, encode_compact, extract_entries, extract_recap_text};
pub use parse::parse_rendered;
pub use render::{ENTRIES_HEADING, SEPARATOR_WIDTH};
