// Route endpoints

use tracing::debug;

use crate::device::client::DeviceClient;
use crate::device::models::{Ack, NewRoute, Route, RouteId};
use crate::error::Error;

impl DeviceClient {
    /// List configured routes, including their byte counters.
    ///
    /// `GET /api/routes`
    pub async fn list_routes(&self) -> Result<Vec<Route>, Error> {
        let url = self.api_url("routes")?;
        debug!("listing routes");
        self.get(url).await
    }

    /// Create (and start) a route. The device assigns the id.
    ///
    /// `PUT /api/routes`
    pub async fn create_route(&self, route: &NewRoute) -> Result<Route, Error> {
        let url = self.api_url("routes")?;
        debug!(
            route_type = %route.route_type,
            src = %route.src_port_id,
            dst_count = route.dst_port_ids.len(),
            "creating route"
        );
        self.put(url, route).await
    }

    /// Stop and remove a route.
    ///
    /// `DELETE /api/routes/{id}`
    pub async fn delete_route(&self, id: RouteId) -> Result<Ack, Error> {
        let url = self.api_url(&format!("routes/{id}"))?;
        debug!(route_id = %id, "deleting route");
        self.delete(url).await
    }
}
