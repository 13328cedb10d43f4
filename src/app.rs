//! The command layer: one note store and the two sync clients, owned
//! together and handed to whatever front end drives them.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::config::Config;
use crate::entity::{Note, NoteFields};
use crate::error::{Result, StudySyncError};
use crate::export::export_document;
use crate::storage::{FileKeyValueStore, KeyValueStore, NotePersistence, StorageHealth};
use crate::store::NoteStore;
use crate::sync::{
    host_platform, ConnectOutcome, NetworkSyncClient, SyncOutcome, UnsupportedPlatform,
    WirelessPlatform, WirelessSyncClient,
};

pub const DATA_DIR: &str = ".studysync";

pub struct App {
    pub store: NoteStore,
    pub network: NetworkSyncClient,
    pub wireless: WirelessSyncClient,
    pub config: Config,
}

impl App {
    /// Wire the components together from explicit parts.
    pub fn new(
        kv: Box<dyn KeyValueStore>,
        config: Config,
        platform: Arc<dyn WirelessPlatform>,
    ) -> Result<Self> {
        let store = NoteStore::open(NotePersistence::new(kv));
        let network = NetworkSyncClient::new(config.device.clone())?;
        let wireless = WirelessSyncClient::new(platform, config.wireless.clone());
        Ok(Self {
            store,
            network,
            wireless,
            config,
        })
    }

    /// Create `.studysync/` under `root` with default config and no notes.
    pub fn init(root: &Path) -> Result<PathBuf> {
        let dir = root.join(DATA_DIR);
        if dir.exists() {
            return Err(StudySyncError::AlreadyInitialized);
        }
        fs::create_dir_all(&dir)?;
        Config::default().save(&dir)?;
        NotePersistence::new(Box::new(FileKeyValueStore::new(&dir))).save(&[])?;
        info!("initialized {}", dir.display());
        Ok(dir)
    }

    /// Open the project at `root` with file storage and no wireless backend.
    /// Commands that never touch BLE use this and skip adapter discovery.
    pub fn open(root: &Path) -> Result<Self> {
        let dir = root.join(DATA_DIR);
        if !dir.is_dir() {
            return Err(StudySyncError::NotInitialized);
        }
        let config = Config::load(&dir)?;
        Self::new(
            Box::new(FileKeyValueStore::new(&dir)),
            config,
            Arc::new(UnsupportedPlatform),
        )
    }

    /// Open the project at `root` with the host's BLE stack, falling back to
    /// [`UnsupportedPlatform`] when there is none.
    pub async fn open_with_host_wireless(root: &Path) -> Result<Self> {
        let app = Self::open(root)?;
        let platform = host_platform(&app.config.wireless).await;
        Ok(app.with_platform(platform))
    }

    /// Swap the wireless backend. Any open link on the old client is left to
    /// its owner.
    pub fn with_platform(mut self, platform: Arc<dyn WirelessPlatform>) -> Self {
        self.wireless = WirelessSyncClient::new(platform, self.config.wireless.clone());
        self
    }

    pub fn add_note(&mut self, fields: NoteFields) -> Result<Note> {
        self.store.create(fields)
    }

    pub fn notes_for_display(&self) -> Vec<Note> {
        self.store.list_for_display()
    }

    pub fn storage_health(&self) -> StorageHealth {
        self.store.storage_health()
    }

    /// Write the export document to `path`.
    pub fn export_to(&self, path: &Path) -> Result<usize> {
        let bytes = export_document(self.store.list())?;
        fs::write(path, &bytes)?;
        Ok(bytes.len())
    }

    /// Push a snapshot of the notes over HTTP.
    pub async fn sync_wifi(&self) -> SyncOutcome {
        let snapshot = self.store.snapshot();
        self.network.sync(&snapshot).await
    }

    /// Connect over BLE, optionally writing the note count afterwards.
    pub async fn connect_bluetooth(&self, send_count: bool) -> ConnectOutcome {
        let filter = self.wireless.filter();
        let peer = self.wireless.connect(&filter).await?;
        if send_count {
            self.wireless.send_note_count(self.store.list()).await?;
        }
        Ok(peer)
    }

    /// Run both transports concurrently; neither waits on the other.
    pub async fn sync_all(&self, send_count: bool) -> (SyncOutcome, ConnectOutcome) {
        tokio::join!(self.sync_wifi(), self.connect_bluetooth(send_count))
    }
}
