// Port endpoints

use tracing::debug;

use crate::device::client::DeviceClient;
use crate::device::models::{Port, PortConfigUpdate, PortId, Reply};
use crate::error::Error;

impl DeviceClient {
    /// List every port the device exposes.
    ///
    /// `GET /api/ports`
    pub async fn list_ports(&self) -> Result<Vec<Port>, Error> {
        let url = self.api_url("ports")?;
        debug!("listing ports");
        self.get(url).await
    }

    /// Change a port's line coding and/or signal overrides.
    ///
    /// `PUT /api/ports/{id}/config`. The device echoes the updated port.
    pub async fn update_port_config(
        &self,
        id: PortId,
        update: &PortConfigUpdate,
    ) -> Result<Reply<Port>, Error> {
        let url = self.api_url(&format!("ports/{id}/config"))?;
        debug!(port_id = %id, "updating port config");
        self.put(url, update).await
    }
}
