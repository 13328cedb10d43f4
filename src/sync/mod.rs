//! Device synchronization over HTTP and BLE.
//!
//! Each transport owns its own status, published on a
//! [`tokio::sync::watch`] channel so whatever drives the UI can observe
//! transitions while an attempt is still running. The two clients share
//! nothing; a failure on one never changes the other's status.

use std::sync::Arc;

use crate::config::WirelessConfig;

#[cfg(feature = "ble")]
mod ble;
mod network;
mod wireless;

#[cfg(feature = "ble")]
pub use ble::BtlePlatform;

pub use network::{NetworkSyncClient, SyncOutcome};
pub use wireless::{
    ConnectOutcome, DeviceFilter, Discovery, PeerInfo, UnsupportedPlatform, WirelessPlatform,
    WirelessSession, WirelessStatus, WirelessSyncClient, DEFAULT_PEER_NAME,
};

/// The host's BLE stack when the `ble` feature is on and an adapter is
/// present, otherwise [`UnsupportedPlatform`].
#[cfg(feature = "ble")]
pub async fn host_platform(config: &WirelessConfig) -> Arc<dyn WirelessPlatform> {
    let scan = std::time::Duration::from_secs(config.scan_secs);
    match BtlePlatform::first_adapter(scan).await {
        Ok(Some(platform)) => return Arc::new(platform),
        Ok(None) => tracing::info!("no Bluetooth adapter found"),
        Err(e) => tracing::warn!("Bluetooth stack unavailable: {}", e),
    }
    Arc::new(UnsupportedPlatform)
}

#[cfg(not(feature = "ble"))]
pub async fn host_platform(_config: &WirelessConfig) -> Arc<dyn WirelessPlatform> {
    Arc::new(UnsupportedPlatform)
}

/// Status of the HTTP push.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SyncStatus {
    #[default]
    Idle,
    InProgress,
    Ok(String),
    Error(String),
}

impl SyncStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncStatus::Ok(_) | SyncStatus::Error(_))
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncStatus::Idle => write!(f, "Wi-Fi: not synced"),
            SyncStatus::InProgress => write!(f, "Wi-Fi: syncing..."),
            SyncStatus::Ok(detail) => write!(f, "Wi-Fi: {}", detail),
            SyncStatus::Error(detail) => write!(f, "Wi-Fi: sync failed: {}", detail),
        }
    }
}
