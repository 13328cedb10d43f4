use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{debug, error};

use crate::error::{Result, StudySyncError};

const TMP_SUFFIX: &str = ".tmp";

/// Durable string blobs addressed by key.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// One `<key>.json` file per key inside a directory.
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        let mut tmp = path.clone().into_os_string();
        tmp.push(TMP_SUFFIX);
        let tmp = PathBuf::from(tmp);

        debug!("writing \"{}\" via \"{}\"", path.display(), tmp.display());
        if let Err(e) = write_synced(&tmp, value) {
            error!("failed to write tmp file \"{}\": {e}", tmp.display());
            remove_tmp(&tmp);
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&tmp, &path) {
            // the old blob is still intact; drop the new one
            error!(
                "failed to rename tmp file \"{}\" to \"{}\": {e}",
                tmp.display(),
                path.display(),
            );
            remove_tmp(&tmp);
            return Err(e.into());
        }
        Ok(())
    }
}

fn write_synced(path: &Path, value: &str) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(value.as_bytes())?;
    file.sync_all()
}

fn remove_tmp(tmp: &Path) {
    match fs::remove_file(tmp) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => error!("failed to remove tmp file \"{}\": {e}", tmp.display()),
    }
}

#[derive(Default)]
struct MemoryInner {
    values: HashMap<String, String>,
    writes: Vec<(String, String)>,
    fail_writes: bool,
}

/// In-memory store. Clones share the same contents, so a caller can keep a
/// handle to inspect what was written.
#[derive(Clone, Default)]
pub struct MemoryKeyValueStore {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raw value without recording it as a write.
    pub fn with_value(self, key: &str, value: &str) -> Self {
        self.lock().values.insert(key.to_string(), value.to_string());
        self
    }

    /// Make every subsequent `set` fail, as a full quota would.
    pub fn fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Every successful `set`, oldest first.
    pub fn writes(&self) -> Vec<(String, String)> {
        self.lock().writes.clone()
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.lock().values.get(key).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        // poisoned only if a holder panicked mid-insert
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock().values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut inner = self.lock();
        if inner.fail_writes {
            return Err(StudySyncError::Storage("storage quota exceeded".to_string()));
        }
        inner.values.insert(key.to_string(), value.to_string());
        inner.writes.push((key.to_string(), value.to_string()));
        Ok(())
    }
}
