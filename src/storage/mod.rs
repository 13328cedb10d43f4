mod kv_store;
mod note_persistence;

pub use kv_store::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
pub use note_persistence::{NotePersistence, StorageHealth, STORAGE_KEY};
