//! Recap conversion command handlers.

use super::commands::{RecapCommands, RecapField};
use chronicler::{
    ChroniclerError, ChroniclerResult, JsonError, StorageError, StorageErrorKind, compact, decode,
    encode, extract_entries, extract_recap_text,
};
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Handle recap subcommands.
pub fn handle_recap_command(command: RecapCommands) -> ChroniclerResult<()> {
    let file = match &command {
        RecapCommands::Format { file }
        | RecapCommands::Compact { file }
        | RecapCommands::Extract { file, .. } => file.clone(),
    };
    let input = read_input(file.as_deref())?;
    println!("{}", convert(&command, &input)?);
    Ok(())
}

fn read_input(file: Option<&Path>) -> ChroniclerResult<String> {
    match file {
        Some(path) => {
            debug!(path = %path.display(), "Reading recap");
            std::fs::read_to_string(path).map_err(|e| {
                ChroniclerError::from(StorageError::new(StorageErrorKind::FileRead(format!(
                    "{}: {}",
                    path.display(),
                    e
                ))))
            })
        }
        None => {
            let mut input = String::new();
            std::io::stdin().read_to_string(&mut input).map_err(|e| {
                ChroniclerError::from(StorageError::new(StorageErrorKind::FileRead(format!(
                    "stdin: {}",
                    e
                ))))
            })?;
            Ok(input)
        }
    }
}

fn convert(command: &RecapCommands, input: &str) -> ChroniclerResult<String> {
    let output = match command {
        RecapCommands::Format { .. } => encode(&decode(input)),
        RecapCommands::Compact { .. } => compact(input),
        RecapCommands::Extract {
            field: RecapField::Recap,
            ..
        } => extract_recap_text(input),
        RecapCommands::Extract {
            field: RecapField::Entries,
            ..
        } => serde_json::to_string_pretty(&extract_entries(input)).map_err(JsonError::from)?,
    };
    Ok(output)
}
