use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::config::WirelessConfig;
use crate::entity::Note;
use crate::error::{Result, StudySyncError};

/// Name shown for a peer that advertises none.
pub const DEFAULT_PEER_NAME: &str = "device";

const NOT_SUPPORTED: &str = "not supported";
const CANCELLED: &str = "cancelled";

/// Status of the BLE link.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WirelessStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected(String),
    Failed(String),
}

impl std::fmt::Display for WirelessStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WirelessStatus::Disconnected => write!(f, "Bluetooth: disconnected"),
            WirelessStatus::Connecting => write!(f, "Bluetooth: connecting..."),
            WirelessStatus::Connected(peer) => write!(f, "Bluetooth: connected to {}", peer),
            WirelessStatus::Failed(detail) => write!(f, "Bluetooth: connection failed ({})", detail),
        }
    }
}

/// Terminal result of one connect attempt: the connected peer's name.
pub type ConnectOutcome = Result<String>;

/// An advertising peer as reported by discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerInfo {
    pub id: String,
    pub name: Option<String>,
    pub services: Vec<String>,
}

impl PeerInfo {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(DEFAULT_PEER_NAME)
    }
}

/// Which peers discovery may offer and which services the client may touch
/// once connected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceFilter {
    pub name_prefix: String,
    pub optional_services: Vec<String>,
}

impl DeviceFilter {
    pub fn from_config(config: &WirelessConfig) -> Self {
        Self {
            name_prefix: config.name_prefix.clone(),
            optional_services: config.services.clone(),
        }
    }

    pub fn matches(&self, peer: &PeerInfo) -> bool {
        peer.name
            .as_deref()
            .is_some_and(|name| name.starts_with(&self.name_prefix))
    }

    pub fn allows_service(&self, service: &str) -> bool {
        self.optional_services
            .iter()
            .any(|s| s.eq_ignore_ascii_case(service))
    }
}

/// Result of the user-mediated device chooser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discovery {
    Selected(PeerInfo),
    Cancelled,
}

/// Platform BLE stack.
#[async_trait]
pub trait WirelessPlatform: Send + Sync {
    /// Whether this platform has a usable BLE stack at all.
    fn is_available(&self) -> bool;

    /// Let the user pick a nearby peer matching `filter`.
    async fn request_device(&self, filter: &DeviceFilter) -> Result<Discovery>;

    /// Open a GATT session to `peer`.
    async fn connect(&self, peer: &PeerInfo) -> Result<Box<dyn WirelessSession>>;
}

/// An established link to one peer.
#[async_trait]
pub trait WirelessSession: Send + Sync {
    fn peer(&self) -> &PeerInfo;

    async fn write(&self, service: &str, characteristic: &str, bytes: &[u8]) -> Result<()>;

    async fn disconnect(&self);

    /// Resolves once the peer drops the link. Backends without disconnect
    /// notifications never resolve.
    async fn closed(&self) {
        std::future::pending::<()>().await
    }
}

/// Backend for hosts without a BLE stack.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedPlatform;

#[async_trait]
impl WirelessPlatform for UnsupportedPlatform {
    fn is_available(&self) -> bool {
        false
    }

    async fn request_device(&self, _filter: &DeviceFilter) -> Result<Discovery> {
        Err(StudySyncError::WirelessUnsupported)
    }

    async fn connect(&self, _peer: &PeerInfo) -> Result<Box<dyn WirelessSession>> {
        Err(StudySyncError::WirelessUnsupported)
    }
}

/// Connects to the device over BLE and writes payloads to it.
#[derive(Clone)]
pub struct WirelessSyncClient {
    platform: Arc<dyn WirelessPlatform>,
    config: WirelessConfig,
    status: Arc<watch::Sender<WirelessStatus>>,
    session: Arc<Mutex<Option<Arc<dyn WirelessSession>>>>,
    // bumped on every connect and teardown; a link watcher only acts while
    // its own generation is current
    generation: Arc<AtomicU64>,
}

impl WirelessSyncClient {
    pub fn new(platform: Arc<dyn WirelessPlatform>, config: WirelessConfig) -> Self {
        let (status, _) = watch::channel(WirelessStatus::Disconnected);
        Self {
            platform,
            config,
            status: Arc::new(status),
            session: Arc::new(Mutex::new(None)),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn status(&self) -> WirelessStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<WirelessStatus> {
        self.status.subscribe()
    }

    pub fn filter(&self) -> DeviceFilter {
        DeviceFilter::from_config(&self.config)
    }

    /// `Disconnected -> Connecting -> {Connected | Failed}`.
    ///
    /// An unsupported platform fails with `"not supported"` before any
    /// discovery; a dismissed chooser fails with `"cancelled"`. Any session
    /// from an earlier connect is closed first, so a failed reconnect never
    /// leaves the old link open behind a `Failed` status.
    pub async fn connect(&self, filter: &DeviceFilter) -> ConnectOutcome {
        self.set_status(WirelessStatus::Connecting);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let previous = self.session.lock().await.take();
        if let Some(old) = previous {
            old.disconnect().await;
            info!("Bluetooth closed previous link to {}", old.peer().display_name());
        }

        if !self.platform.is_available() {
            warn!("Bluetooth is not supported on this platform");
            self.set_status(WirelessStatus::Failed(NOT_SUPPORTED.to_string()));
            return Err(StudySyncError::WirelessUnsupported);
        }

        let peer = match self.platform.request_device(filter).await {
            Ok(Discovery::Selected(peer)) => peer,
            Ok(Discovery::Cancelled) => {
                info!("Bluetooth device selection cancelled");
                return self.fail(CANCELLED.to_string());
            }
            Err(e) => return self.fail(e.to_string()),
        };

        if !filter.matches(&peer) {
            return self.fail(format!(
                "peer {} does not match prefix {}",
                peer.display_name(),
                filter.name_prefix
            ));
        }

        let session = match self.platform.connect(&peer).await {
            Ok(session) => session,
            Err(e) => return self.fail(e.to_string()),
        };

        let session: Arc<dyn WirelessSession> = Arc::from(session);
        let name = peer.display_name().to_string();
        *self.session.lock().await = Some(session.clone());

        info!("Bluetooth connected to {}", name);
        self.set_status(WirelessStatus::Connected(name.clone()));
        self.watch_link(session, generation);
        Ok(name)
    }

    /// Turn the session's disconnect notification into `link_lost`.
    fn watch_link(&self, session: Arc<dyn WirelessSession>, generation: u64) {
        let client = self.clone();
        tokio::spawn(async move {
            session.closed().await;
            if client.generation.load(Ordering::SeqCst) == generation {
                client.link_lost().await;
            } else {
                debug!("ignoring stale link drop from {}", session.peer().display_name());
            }
        });
    }

    /// Write `bytes` to the configured characteristic of the open session.
    pub async fn send(&self, bytes: &[u8]) -> Result<()> {
        let guard = self.session.lock().await;
        let session = match (guard.as_ref(), self.status()) {
            (Some(session), WirelessStatus::Connected(_)) => session,
            _ => return Err(StudySyncError::Link("not connected".to_string())),
        };

        if !self.filter().allows_service(&self.config.service) {
            return Err(StudySyncError::Link(format!(
                "service {} is not in the allowed services",
                self.config.service
            )));
        }

        session
            .write(&self.config.service, &self.config.characteristic, bytes)
            .await
            .map_err(|e| match e {
                StudySyncError::Link(_) => e,
                other => StudySyncError::Link(other.to_string()),
            })?;
        debug!("wrote {} bytes to {}", bytes.len(), session.peer().display_name());
        Ok(())
    }

    /// Write `{"count": n}` for the given collection.
    pub async fn send_note_count(&self, notes: &[Note]) -> Result<()> {
        let payload = serde_json::to_vec(&serde_json::json!({ "count": notes.len() }))?;
        self.send(&payload).await
    }

    /// User-initiated disconnect.
    pub async fn disconnect(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let session = self.session.lock().await.take();
        if let Some(session) = session {
            session.disconnect().await;
            info!("Bluetooth disconnected from {}", session.peer().display_name());
        }
        self.set_status(WirelessStatus::Disconnected);
    }

    /// The platform reported that the link dropped.
    pub async fn link_lost(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let session = self.session.lock().await.take();
        if let Some(session) = session {
            warn!("Bluetooth link to {} lost", session.peer().display_name());
        }
        if matches!(self.status(), WirelessStatus::Connected(_)) {
            self.set_status(WirelessStatus::Disconnected);
        }
    }

    fn fail(&self, detail: String) -> ConnectOutcome {
        warn!("Bluetooth error: {}", detail);
        self.set_status(WirelessStatus::Failed(detail.clone()));
        Err(StudySyncError::WirelessConnect(detail))
    }

    fn set_status(&self, status: WirelessStatus) {
        debug!("wireless status: {:?}", status);
        self.status.send_replace(status);
    }
}
