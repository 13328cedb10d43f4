//! Host BLE stack through btleplug.
//!
//! Discovery scans for a fixed window and offers the first advertised peer
//! whose name matches the filter; an empty scan counts as a dismissed
//! chooser.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{Central, CentralEvent, Manager as _, Peripheral as _, ScanFilter, WriteType};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures_util::StreamExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::wireless::{DeviceFilter, Discovery, PeerInfo, WirelessPlatform, WirelessSession};
use crate::error::{Result, StudySyncError};

pub struct BtlePlatform {
    adapter: Adapter,
    scan: Duration,
    seen: Mutex<HashMap<String, Peripheral>>,
}

impl BtlePlatform {
    /// The first adapter the host reports, or `None` when it has none.
    pub async fn first_adapter(scan: Duration) -> Result<Option<Self>> {
        let manager = Manager::new().await.map_err(connect_error)?;
        let adapter = manager
            .adapters()
            .await
            .map_err(connect_error)?
            .into_iter()
            .next();
        Ok(adapter.map(|adapter| Self {
            adapter,
            scan,
            seen: Mutex::new(HashMap::new()),
        }))
    }

    async fn peer_info(peripheral: &Peripheral) -> Option<PeerInfo> {
        let props = peripheral.properties().await.ok().flatten()?;
        Some(PeerInfo {
            id: format!("{:?}", peripheral.id()),
            name: props.local_name,
            services: props.services.iter().map(|s| s.to_string()).collect(),
        })
    }
}

#[async_trait]
impl WirelessPlatform for BtlePlatform {
    fn is_available(&self) -> bool {
        true
    }

    async fn request_device(&self, filter: &DeviceFilter) -> Result<Discovery> {
        info!(
            "scanning {}s for peers named {}*",
            self.scan.as_secs(),
            filter.name_prefix
        );
        self.adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(connect_error)?;
        tokio::time::sleep(self.scan).await;
        let peripherals = self.adapter.peripherals().await.map_err(connect_error);
        if let Err(e) = self.adapter.stop_scan().await {
            warn!("failed to stop BLE scan: {}", e);
        }

        let mut candidates = Vec::new();
        for peripheral in peripherals? {
            if let Some(peer) = Self::peer_info(&peripheral).await {
                if filter.matches(&peer) {
                    candidates.push((peer, peripheral));
                }
            }
        }
        candidates.sort_by(|a, b| a.0.name.cmp(&b.0.name));

        let Some((peer, peripheral)) = candidates.into_iter().next() else {
            info!("no peer named {}* in range", filter.name_prefix);
            return Ok(Discovery::Cancelled);
        };
        debug!("selected {} ({})", peer.display_name(), peer.id);
        self.seen.lock().await.insert(peer.id.clone(), peripheral);
        Ok(Discovery::Selected(peer))
    }

    async fn connect(&self, peer: &PeerInfo) -> Result<Box<dyn WirelessSession>> {
        let peripheral = self.seen.lock().await.get(&peer.id).cloned().ok_or_else(|| {
            StudySyncError::WirelessConnect(format!("{} was not discovered", peer.display_name()))
        })?;

        peripheral.connect().await.map_err(connect_error)?;
        if let Err(e) = peripheral.discover_services().await {
            if let Err(e) = peripheral.disconnect().await {
                warn!("failed to drop half-open link to {}: {}", peer.display_name(), e);
            }
            return Err(connect_error(e));
        }

        Ok(Box::new(BtleSession {
            peer: peer.clone(),
            peripheral,
            adapter: self.adapter.clone(),
        }))
    }
}

struct BtleSession {
    peer: PeerInfo,
    peripheral: Peripheral,
    adapter: Adapter,
}

#[async_trait]
impl WirelessSession for BtleSession {
    fn peer(&self) -> &PeerInfo {
        &self.peer
    }

    async fn write(&self, service: &str, characteristic: &str, bytes: &[u8]) -> Result<()> {
        let service = parse_uuid(service)?;
        let characteristic = parse_uuid(characteristic)?;
        let target = self
            .peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.service_uuid == service && c.uuid == characteristic)
            .ok_or_else(|| {
                StudySyncError::Link(format!(
                    "characteristic {} not found on {}",
                    characteristic,
                    self.peer.display_name()
                ))
            })?;

        self.peripheral
            .write(&target, bytes, WriteType::WithResponse)
            .await
            .map_err(|e| StudySyncError::Link(e.to_string()))
    }

    async fn disconnect(&self) {
        if let Err(e) = self.peripheral.disconnect().await {
            warn!("failed to disconnect from {}: {}", self.peer.display_name(), e);
        }
    }

    async fn closed(&self) {
        let mut events = match self.adapter.events().await {
            Ok(events) => events,
            Err(e) => {
                warn!("adapter gives no disconnect notifications: {}", e);
                std::future::pending::<()>().await;
                return;
            }
        };
        let id = self.peripheral.id();
        while let Some(event) = events.next().await {
            if let CentralEvent::DeviceDisconnected(gone) = event {
                if gone == id {
                    return;
                }
            }
        }
        // the adapter's event stream ending means the stack went away
    }
}

fn connect_error(e: btleplug::Error) -> StudySyncError {
    StudySyncError::WirelessConnect(e.to_string())
}

fn parse_uuid(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| StudySyncError::Link(format!("bad UUID {}: {}", value, e)))
}
