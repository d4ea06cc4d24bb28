// Device-level endpoints: persisted configuration and system status.

use tracing::debug;

use crate::device::client::DeviceClient;
use crate::device::models::{Ack, ConfigUpdate, DeviceConfig, Reply, SystemInfo};
use crate::error::Error;

impl DeviceClient {
    /// Get the device configuration (WiFi status, TCP slot settings).
    ///
    /// `GET /api/config`
    pub async fn get_config(&self) -> Result<DeviceConfig, Error> {
        let url = self.api_url("config")?;
        debug!("fetching device config");
        self.get(url).await
    }

    /// Update WiFi credentials and/or TCP slot settings.
    ///
    /// `PUT /api/config`
    ///
    /// Current firmware answers with an [`Ack`]; a WiFi change sets
    /// `wifiChanging` and the device drops its link shortly afterwards.
    pub async fn update_config(&self, update: &ConfigUpdate) -> Result<Reply<DeviceConfig>, Error> {
        let url = self.api_url("config")?;
        debug!(
            wifi = update.wifi.is_some(),
            tcp = update.tcp_configs.as_ref().map_or(0, Vec::len),
            "updating device config"
        );
        self.put(url, update).await
    }

    /// Restore factory configuration. Takes effect after a reboot.
    ///
    /// `POST /api/config/reset`
    pub async fn reset_config(&self) -> Result<Ack, Error> {
        let url = self.api_url("config/reset")?;
        debug!("resetting device config");
        self.post(url).await
    }

    /// Firmware identity, counts, heap, and uptime.
    ///
    /// `GET /api/system`
    pub async fn get_system(&self) -> Result<SystemInfo, Error> {
        let url = self.api_url("system")?;
        debug!("fetching system info");
        self.get(url).await
    }
}
