mod note;

pub use note::{Note, NoteFields, DEFAULT_PRIORITY, DEFAULT_SUBJECT};

/// Ordered sequence of notes; insertion order is canonical.
pub type NoteCollection = Vec<Note>;
