//! The canonical note collection.
//!
//! `NoteStore` owns the notes in insertion order and writes the whole
//! collection back through [`NotePersistence`] after every mutation. Reads
//! never observe a partially applied change because every mutator runs to
//! completion on the caller's thread before returning.

use chrono::Utc;
use tracing::{debug, info};

use crate::entity::{Note, NoteCollection, NoteFields};
use crate::error::{Result, StudySyncError};
use crate::storage::{NotePersistence, StorageHealth};

type Clock = Box<dyn Fn() -> i64 + Send>;

pub struct NoteStore {
    notes: NoteCollection,
    persistence: NotePersistence,
    clock: Clock,
}

impl NoteStore {
    /// Load the collection once from `persistence`.
    pub fn open(persistence: NotePersistence) -> Self {
        Self::with_clock(persistence, Box::new(|| Utc::now().timestamp_millis()))
    }

    /// Like [`NoteStore::open`] with a custom millisecond clock.
    pub fn with_clock(mut persistence: NotePersistence, clock: Clock) -> Self {
        let notes = persistence.load();
        Self {
            notes,
            persistence,
            clock,
        }
    }

    /// Validate and append a new note.
    ///
    /// Blank text is rejected without touching the collection or storage.
    pub fn create(&mut self, fields: NoteFields) -> Result<Note> {
        let now = (self.clock)();
        let note = Note::from_fields(fields, now).ok_or_else(|| {
            StudySyncError::Validation("Please write a note before saving.".to_string())
        })?;

        self.notes.push(note.clone());
        self.persist();
        info!("created note {}", note.id);
        Ok(note)
    }

    /// Remove the note with `id`.
    pub fn delete_by_id(&mut self, id: &str) -> Result<Note> {
        let pos = self
            .notes
            .iter()
            .position(|n| n.id == id)
            .ok_or_else(|| StudySyncError::NoteNotFound(id.to_string()))?;

        let removed = self.notes.remove(pos);
        self.persist();
        info!("deleted note {}", removed.id);
        Ok(removed)
    }

    /// Remove the note shown at `index` in display order.
    ///
    /// The index is resolved to an id against the current display order
    /// right before deleting.
    pub fn delete_at(&mut self, index: usize) -> Result<Note> {
        let id = self
            .list_for_display()
            .get(index)
            .map(|n| n.id.clone())
            .ok_or(StudySyncError::IndexOutOfRange {
                index,
                len: self.notes.len(),
            })?;
        self.delete_by_id(&id)
    }

    /// Drop every note. Callers are expected to confirm first.
    pub fn clear_all(&mut self) {
        let count = self.notes.len();
        self.notes.clear();
        self.persist();
        info!("cleared {} notes", count);
    }

    /// Canonical (insertion) order.
    pub fn list(&self) -> &[Note] {
        &self.notes
    }

    /// Newest first; notes created in the same millisecond keep insertion order.
    pub fn list_for_display(&self) -> Vec<Note> {
        let mut sorted = self.notes.clone();
        // sort_by is stable
        sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        sorted
    }

    /// Owned copy of the collection for a sync attempt.
    pub fn snapshot(&self) -> NoteCollection {
        self.notes.clone()
    }

    /// Find a note by full id or unique id prefix.
    pub fn find(&self, id_or_prefix: &str) -> Result<&Note> {
        if let Some(note) = self.notes.iter().find(|n| n.id == id_or_prefix) {
            return Ok(note);
        }
        let mut matches = self.notes.iter().filter(|n| n.id.starts_with(id_or_prefix));
        match (matches.next(), matches.next()) {
            (Some(note), None) if !id_or_prefix.is_empty() => Ok(note),
            _ => Err(StudySyncError::NoteNotFound(id_or_prefix.to_string())),
        }
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn storage_health(&self) -> StorageHealth {
        self.persistence.health()
    }

    fn persist(&mut self) {
        // failures are reported through storage_health()
        if self.persistence.save(&self.notes).is_err() {
            debug!("continuing with unsaved changes in memory");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryKeyValueStore, STORAGE_KEY};
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;

    fn memory_store() -> (NoteStore, MemoryKeyValueStore) {
        let kv = MemoryKeyValueStore::new();
        let store = NoteStore::open(NotePersistence::new(Box::new(kv.clone())));
        (store, kv)
    }

    /// Clock that advances by `step` ms on every read.
    fn ticking_store(start: i64, step: i64) -> (NoteStore, MemoryKeyValueStore) {
        let kv = MemoryKeyValueStore::new();
        let now = Arc::new(AtomicI64::new(start));
        let clock = Box::new(move || now.fetch_add(step, Ordering::SeqCst));
        let store = NoteStore::with_clock(NotePersistence::new(Box::new(kv.clone())), clock);
        (store, kv)
    }

    fn saved_notes(kv: &MemoryKeyValueStore) -> Vec<Note> {
        serde_json::from_str(&kv.raw(STORAGE_KEY).unwrap()).unwrap()
    }

    #[test]
    fn test_create_then_list() {
        let (mut store, _kv) = memory_store();
        let before = Utc::now().timestamp_millis();

        let created = store
            .create(
                NoteFields::new("Read ch.4")
                    .subject("Math")
                    .priority("high"),
            )
            .unwrap();

        let notes = store.list();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0], created);
        assert_eq!(notes[0].text, "Read ch.4");
        assert_eq!(notes[0].subject, "Math");
        assert_eq!(notes[0].priority, "high");
        assert_eq!(notes[0].due_date, None);
        assert_eq!(notes[0].due_time, None);
        assert!(!notes[0].id.is_empty());
        assert!(notes[0].created_at >= before);
    }

    #[test]
    fn test_create_generates_unique_ids() {
        let (mut store, _kv) = memory_store();
        let a = store.create(NoteFields::new("a")).unwrap();
        let b = store.create(NoteFields::new("a")).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_create_blank_is_rejected_without_save() {
        let (mut store, kv) = memory_store();
        store.create(NoteFields::new("kept")).unwrap();
        let writes_before = kv.writes().len();

        let result = store.create(NoteFields::new("   "));
        assert!(matches!(result, Err(StudySyncError::Validation(_))));
        assert_eq!(store.len(), 1);
        assert_eq!(kv.writes().len(), writes_before);
    }

    #[test]
    fn test_every_mutation_saves_current_state() {
        let (mut store, kv) = ticking_store(1_000, 10);

        let a = store.create(NoteFields::new("a")).unwrap();
        assert_eq!(saved_notes(&kv), store.list());
        store.create(NoteFields::new("b")).unwrap();
        assert_eq!(saved_notes(&kv), store.list());
        store.delete_by_id(&a.id).unwrap();
        assert_eq!(saved_notes(&kv), store.list());
        store.create(NoteFields::new("c")).unwrap();
        store.delete_at(0).unwrap();
        assert_eq!(saved_notes(&kv), store.list());
        store.clear_all();
        assert_eq!(saved_notes(&kv), store.list());

        // create, create, delete, create, delete, clear
        assert_eq!(kv.writes().len(), 6);
    }

    #[test]
    fn test_display_order_is_newest_first() {
        let (mut store, _kv) = ticking_store(1_000, 5);
        store.create(NoteFields::new("oldest")).unwrap();
        store.create(NoteFields::new("middle")).unwrap();
        store.create(NoteFields::new("newest")).unwrap();

        let display: Vec<_> = store.list_for_display().into_iter().map(|n| n.text).collect();
        assert_eq!(display, vec!["newest", "middle", "oldest"]);

        let canonical: Vec<_> = store.list().iter().map(|n| n.text.as_str()).collect();
        assert_eq!(canonical, vec!["oldest", "middle", "newest"]);
    }

    #[test]
    fn test_display_order_ties_keep_insertion_order() {
        let (mut store, _kv) = ticking_store(7, 0);
        store.create(NoteFields::new("first")).unwrap();
        store.create(NoteFields::new("second")).unwrap();

        let display = store.list_for_display();
        assert_eq!(display[0].text, "first");
        assert_eq!(display[1].text, "second");
        assert!(display.windows(2).all(|w| w[0].created_at >= w[1].created_at));
    }

    #[test]
    fn test_delete_at_uses_display_position() {
        let (mut store, _kv) = ticking_store(1_000, 5);
        store.create(NoteFields::new("old")).unwrap();
        store.create(NoteFields::new("new")).unwrap();

        let removed = store.delete_at(0).unwrap();
        assert_eq!(removed.text, "new");
        assert_eq!(store.list()[0].text, "old");
    }

    #[test]
    fn test_delete_at_out_of_range() {
        let (mut store, kv) = memory_store();
        store.create(NoteFields::new("a")).unwrap();
        let writes = kv.writes().len();

        let result = store.delete_at(3);
        assert!(matches!(
            result,
            Err(StudySyncError::IndexOutOfRange { index: 3, len: 1 })
        ));
        assert_eq!(kv.writes().len(), writes);
    }

    #[test]
    fn test_delete_unknown_id() {
        let (mut store, kv) = memory_store();
        let result = store.delete_by_id("missing");
        assert!(matches!(result, Err(StudySyncError::NoteNotFound(_))));
        assert!(kv.writes().is_empty());
    }

    #[test]
    fn test_clear_all_saves_empty_sequence() {
        let (mut store, kv) = memory_store();
        for text in ["a", "b", "c"] {
            store.create(NoteFields::new(text)).unwrap();
        }
        store.clear_all();

        assert!(store.list().is_empty());
        assert_eq!(kv.raw(STORAGE_KEY).as_deref(), Some("[]"));
    }

    #[test]
    fn test_failed_save_keeps_memory_state() {
        let (mut store, kv) = memory_store();
        kv.fail_writes(true);

        let note = store.create(NoteFields::new("unsaved")).unwrap();
        assert_eq!(store.list(), &[note]);
        assert!(!store.storage_health().is_ok());
    }

    #[test]
    fn test_reopen_loads_saved_notes() {
        let (mut store, kv) = memory_store();
        store.create(NoteFields::new("persisted")).unwrap();

        let reopened = NoteStore::open(NotePersistence::new(Box::new(kv)));
        assert_eq!(reopened.list(), store.list());
    }

    #[test]
    fn test_find_by_prefix() {
        let (mut store, _kv) = memory_store();
        let note = store.create(NoteFields::new("a")).unwrap();
        assert_eq!(store.find(&note.id[..6]).unwrap().id, note.id);
        assert!(store.find("").is_err());
        assert!(store.find("zzzz-not-an-id").is_err());
    }
}
