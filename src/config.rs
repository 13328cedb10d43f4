use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StudySyncError};

pub const CONFIG_FILE: &str = "config.json";

/// Environment variable that overrides `device.base_url`.
pub const DEVICE_URL_ENV: &str = "STUDYSYNC_DEVICE_URL";

/// Project configuration, stored as `.studysync/config.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub wireless: WirelessConfig,
}

/// HTTP side of the companion device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// e.g. "http://192.168.1.50" or "http://esp32-study.local"
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_sync_path")]
    pub sync_path: String,
    #[serde(default = "default_status_path")]
    pub status_path: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// BLE side of the companion device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WirelessConfig {
    /// Advertised name prefix a peer must carry.
    #[serde(default = "default_name_prefix")]
    pub name_prefix: String,
    /// Services the client may use after connecting.
    #[serde(default = "default_services")]
    pub services: Vec<String>,
    #[serde(default = "default_service")]
    pub service: String,
    #[serde(default = "default_characteristic")]
    pub characteristic: String,
    /// How long the host scan listens for advertisements.
    #[serde(default = "default_scan_secs")]
    pub scan_secs: u64,
}

fn default_base_url() -> String {
    "http://192.168.1.50".to_string()
}

fn default_sync_path() -> String {
    "/api/notes".to_string()
}

fn default_status_path() -> String {
    "/api/status".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_name_prefix() -> String {
    "StudyReminder".to_string()
}

fn default_service() -> String {
    "0000ffe0-0000-1000-8000-00805f9b34fb".to_string()
}

fn default_characteristic() -> String {
    "0000ffe1-0000-1000-8000-00805f9b34fb".to_string()
}

fn default_scan_secs() -> u64 {
    5
}

fn default_services() -> Vec<String> {
    vec![default_service()]
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            sync_path: default_sync_path(),
            status_path: default_status_path(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for WirelessConfig {
    fn default() -> Self {
        Self {
            name_prefix: default_name_prefix(),
            services: default_services(),
            service: default_service(),
            characteristic: default_characteristic(),
            scan_secs: default_scan_secs(),
        }
    }
}

impl DeviceConfig {
    pub fn sync_url(&self) -> String {
        join_url(&self.base_url, &self.sync_path)
    }

    pub fn status_url(&self) -> String {
        join_url(&self.base_url, &self.status_path)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

impl Config {
    /// Read `config.json` from `dir`, falling back to defaults when it does
    /// not exist, then apply environment overrides.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);
        let mut config = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            serde_json::from_str(&raw).map_err(|e| {
                StudySyncError::Config(format!("{}: {}", path.display(), e))
            })?
        } else {
            Config::default()
        };
        config.apply_env_overrides(std::env::var(DEVICE_URL_ENV).ok());
        Ok(config)
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        fs::write(dir.join(CONFIG_FILE), serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    fn apply_env_overrides(&mut self, device_url: Option<String>) {
        if let Some(url) = device_url.filter(|u| !u.trim().is_empty()) {
            self.device.base_url = url;
        }
    }
}
