//! Portable `{ "notes": [...] }` document.

use serde::Serialize;

use crate::entity::Note;
use crate::error::Result;

/// Default file name for a manual export.
pub const EXPORT_FILE_NAME: &str = "study-notes.json";

/// Wrapper used both for export files and for the network sync body.
#[derive(Debug, Serialize)]
pub struct NotesDocument<'a> {
    pub notes: &'a [Note],
}

/// Pretty-printed export bytes for `notes`.
pub fn export_document(notes: &[Note]) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(&NotesDocument { notes })?)
}
