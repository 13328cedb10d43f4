use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::DeviceConfig;
use crate::entity::Note;
use crate::error::{Result, StudySyncError};
use crate::export::NotesDocument;

use super::SyncStatus;

const SYNC_OK_DETAIL: &str = "Notes sent to device successfully";

/// Terminal result of one push: the success detail, or
/// [`StudySyncError::NetworkSync`] with the failure detail.
pub type SyncOutcome = Result<String>;

/// Pushes the whole collection to the device in a single POST.
///
/// Clones share the status channel, so a second attempt can be started
/// while the first is still awaiting its response.
#[derive(Clone)]
pub struct NetworkSyncClient {
    http: reqwest::Client,
    config: DeviceConfig,
    status: Arc<watch::Sender<SyncStatus>>,
}

impl NetworkSyncClient {
    pub fn new(config: DeviceConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let (status, _) = watch::channel(SyncStatus::Idle);
        Ok(Self {
            http,
            config,
            status: Arc::new(status),
        })
    }

    pub fn status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    pub fn endpoint(&self) -> String {
        self.config.sync_url()
    }

    /// `Idle -> InProgress -> {Ok | Error}`. No retry.
    pub async fn sync(&self, notes: &[Note]) -> SyncOutcome {
        let url = self.config.sync_url();
        self.set_status(SyncStatus::InProgress);
        info!("sending {} notes to {}", notes.len(), url);

        let response = self
            .http
            .post(&url)
            .json(&NotesDocument { notes })
            .send()
            .await;

        let result = match response {
            Ok(resp) if resp.status().is_success() => Ok(SYNC_OK_DETAIL.to_string()),
            Ok(resp) => Err(format!("HTTP {}", resp.status().as_u16())),
            Err(e) => Err(e.to_string()),
        };

        match result {
            Ok(detail) => {
                self.set_status(SyncStatus::Ok(detail.clone()));
                Ok(detail)
            }
            Err(detail) => {
                warn!("Wi-Fi sync error: {}", detail);
                self.set_status(SyncStatus::Error(detail.clone()));
                Err(StudySyncError::NetworkSync(detail))
            }
        }
    }

    /// Fetch the device's status document. Leaves the push status alone.
    pub async fn device_status(&self) -> Result<serde_json::Value> {
        let url = self.config.status_url();
        debug!("requesting device status from {}", url);
        let value = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json::<serde_json::Value>()
            .await?;
        Ok(value)
    }

    fn set_status(&self, status: SyncStatus) {
        debug!("network sync status: {:?}", status);
        self.status.send_replace(status);
    }
}
