use tracing::{debug, warn};

use crate::entity::{Note, NoteCollection};
use crate::error::Result;

use super::kv_store::KeyValueStore;

/// Storage key of the note blob.
pub const STORAGE_KEY: &str = "smart_study_notes_v1";

/// Whether the durability boundary is currently trustworthy.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StorageHealth {
    #[default]
    Ok,
    /// In-memory notes keep working but changes may not survive a restart.
    Degraded(String),
}

impl StorageHealth {
    pub fn is_ok(&self) -> bool {
        matches!(self, StorageHealth::Ok)
    }
}

impl std::fmt::Display for StorageHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageHealth::Ok => write!(f, "Local storage OK"),
            StorageHealth::Degraded(detail) => write!(f, "Local storage error: {}", detail),
        }
    }
}

/// Loads and saves the whole note collection as a bare JSON array under
/// [`STORAGE_KEY`].
pub struct NotePersistence {
    kv: Box<dyn KeyValueStore>,
    load_health: StorageHealth,
    save_health: StorageHealth,
}

impl NotePersistence {
    pub fn new(kv: Box<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            load_health: StorageHealth::Ok,
            save_health: StorageHealth::Ok,
        }
    }

    /// Saved notes, or an empty collection when nothing is stored or the blob
    /// is not a well-formed array of notes. Never fails.
    pub fn load(&mut self) -> NoteCollection {
        let raw = match self.kv.get(STORAGE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("Error loading notes: {}", e);
                self.load_health = StorageHealth::Degraded(e.to_string());
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<Note>>(&raw) {
            Ok(notes) => {
                debug!("loaded {} notes", notes.len());
                notes
            }
            Err(e) => {
                warn!("Error loading notes: {}", e);
                self.load_health = StorageHealth::Degraded(format!("unreadable notes: {}", e));
                Vec::new()
            }
        }
    }

    /// Overwrite the stored blob. A failure marks storage degraded and is
    /// returned, but nothing is rolled back.
    pub fn save(&mut self, notes: &[Note]) -> Result<()> {
        let result: Result<()> = serde_json::to_string(notes)
            .map_err(Into::into)
            .and_then(|blob| self.kv.set(STORAGE_KEY, &blob));

        match &result {
            Ok(()) => self.save_health = StorageHealth::Ok,
            Err(e) => {
                warn!("Error saving notes: {}", e);
                self.save_health = StorageHealth::Degraded(e.to_string());
            }
        }
        result
    }

    /// Degraded if the last save failed, or if the initial load did.
    pub fn health(&self) -> StorageHealth {
        if !self.save_health.is_ok() {
            return self.save_health.clone();
        }
        self.load_health.clone()
    }
}
