// ── Dashboard ──
//
// Composition root for one device. Owns the request client, the four
// stores, and both push channels. Refreshes run on the caller's task;
// each channel and its fold task run in the background between `start()`
// and `shutdown()`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use vuart_api::models::{
    Ack, ConfigUpdate, DeviceConfig, NewRoute, Port, PortConfigUpdate, PortId, Reply, Route,
    RouteId, SystemInfo,
};
use vuart_api::transport::{TlsMode, TransportConfig};
use vuart_api::{ChannelConfig, ChannelEndpoint, ChannelHandle, ChannelState, DeviceClient, Frame};

use crate::config::{DashboardConfig, TlsVerification};
use crate::error::CoreError;
use crate::store::{DataFlowState, DeviceStore, SignalState, Snapshot};
use crate::stream::StateStream;

// ── Dashboard ────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<DashboardInner>`. Creating a dashboard does
/// no I/O; call [`start`](Self::start) to open the push channels and the
/// `refresh_*` methods to pull snapshots.
#[derive(Clone)]
pub struct Dashboard {
    inner: Arc<DashboardInner>,
}

struct DashboardInner {
    config: DashboardConfig,
    client: DeviceClient,
    store: Arc<DeviceStore>,
    cancel: CancellationToken,
    started: AtomicBool,
    channels: Mutex<Vec<ChannelHandle>>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Dashboard {
    /// Create a dashboard from configuration. Builds the HTTP client but
    /// does not contact the device.
    pub fn new(config: DashboardConfig) -> Result<Self, CoreError> {
        let transport = build_transport(&config);
        let client = DeviceClient::new(config.url.clone(), &transport)?;
        Ok(Self::with_client(config, client))
    }

    /// Create a dashboard around an existing client.
    pub fn with_client(config: DashboardConfig, client: DeviceClient) -> Self {
        Self {
            inner: Arc::new(DashboardInner {
                config,
                client,
                store: Arc::new(DeviceStore::new()),
                cancel: CancellationToken::new(),
                started: AtomicBool::new(false),
                channels: Mutex::new(Vec::new()),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.inner.config
    }

    pub fn client(&self) -> &DeviceClient {
        &self.inner.client
    }

    pub fn store(&self) -> &Arc<DeviceStore> {
        &self.inner.store
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Open the enabled push channels and spawn their fold tasks (plus the
    /// periodic refresh task when configured).
    ///
    /// Returns immediately; connection attempts happen in the background and
    /// are visible through [`channel_state`](Self::channel_state). Calling
    /// it twice is a no-op. Must be called from within a Tokio runtime.
    pub fn start(&self) -> Result<(), CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::ShutDown);
        }
        if self.inner.started.swap(true, Ordering::SeqCst) {
            debug!("dashboard already started");
            return Ok(());
        }

        let config = &self.inner.config;
        let endpoints = match self.channel_urls() {
            Ok(endpoints) => endpoints,
            Err(e) => {
                self.inner.started.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };

        let mut channels = Vec::new();
        let mut handles = Vec::new();

        for (endpoint, url) in endpoints {
            let channel = ChannelHandle::spawn(
                endpoint,
                url,
                ChannelConfig {
                    reconnect: config.reconnect.clone(),
                    announce_on_open: config.announce_on_open,
                    connect_timeout: config.timeout,
                },
                self.inner.cancel.child_token(),
            );
            handles.push(tokio::spawn(fold_task(
                endpoint,
                channel.subscribe(),
                self.clone(),
                self.inner.cancel.clone(),
            )));
            channels.push(channel);
        }

        if config.refresh_interval_secs > 0 {
            handles.push(tokio::spawn(refresh_task(
                self.clone(),
                config.refresh_interval_secs,
                self.inner.cancel.clone(),
            )));
        }

        lock(&self.inner.channels).extend(channels);
        lock(&self.inner.task_handles).extend(handles);

        info!(url = %config.url, "dashboard started");
        Ok(())
    }

    /// URLs for the enabled channels.
    fn channel_urls(&self) -> Result<Vec<(ChannelEndpoint, url::Url)>, CoreError> {
        let config = &self.inner.config;
        [
            (ChannelEndpoint::Signals, config.signals_enabled),
            (ChannelEndpoint::Monitor, config.monitor_enabled),
        ]
        .into_iter()
        .filter(|(endpoint, enabled)| {
            if !enabled {
                debug!(%endpoint, "channel disabled");
            }
            *enabled
        })
        .map(|(endpoint, _)| -> Result<_, CoreError> {
            Ok((endpoint, self.inner.client.websocket_url(endpoint.path())?))
        })
        .collect()
    }

    /// Stop both channels (including any pending backoff wait) and every
    /// background task, then wait for them to finish. Idempotent.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let channels = std::mem::take(&mut *lock(&self.inner.channels));
        for channel in channels {
            channel.shutdown_and_wait().await;
        }

        let handles = std::mem::take(&mut *lock(&self.inner.task_handles));
        for handle in handles {
            let _ = handle.await;
        }

        debug!("dashboard shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    // ── Snapshot refresh ─────────────────────────────────────────

    /// Fetch the port list and replace the port snapshot.
    ///
    /// On failure the previous snapshot is left untouched. Returns the
    /// number of ports now stored.
    pub async fn refresh_ports(&self) -> Result<usize, CoreError> {
        let ports = self.inner.client.list_ports().await?;
        let count = ports.len();
        self.inner.store.ports.replace(ports);
        if self.inner.config.prune_stale_live_keys {
            self.inner.store.prune_signals();
        }
        debug!(ports = count, "port snapshot refreshed");
        Ok(count)
    }

    /// Fetch the route list and replace the route snapshot.
    pub async fn refresh_routes(&self) -> Result<usize, CoreError> {
        let routes = self.inner.client.list_routes().await?;
        let count = routes.len();
        self.inner.store.routes.replace(routes);
        if self.inner.config.prune_stale_live_keys {
            self.inner.store.prune_data_flow();
        }
        debug!(routes = count, "route snapshot refreshed");
        Ok(count)
    }

    /// Refresh ports and routes concurrently.
    ///
    /// Each store is replaced independently; if either fetch fails, the
    /// other still applies and the first error is returned.
    pub async fn refresh_all(&self) -> Result<(), CoreError> {
        let (ports, routes) = tokio::join!(self.refresh_ports(), self.refresh_routes());
        ports?;
        routes?;
        Ok(())
    }

    /// Reload the live store fed by `endpoint` from a fresh snapshot.
    ///
    /// Ports carry their control lines and routes their byte totals, so a
    /// refresh restores keys whose frames were lost.
    pub async fn resync_live(&self, endpoint: ChannelEndpoint) -> Result<(), CoreError> {
        match endpoint {
            ChannelEndpoint::Signals => {
                self.refresh_ports().await?;
                self.inner.store.resync_signals();
            }
            ChannelEndpoint::Monitor => {
                self.refresh_routes().await?;
                self.inner.store.resync_data_flow();
            }
        }
        Ok(())
    }

    // ── Device operations ────────────────────────────────────────

    pub async fn update_port_config(
        &self,
        id: PortId,
        update: &PortConfigUpdate,
    ) -> Result<Reply<Port>, CoreError> {
        let reply = self.inner.client.update_port_config(id, update).await?;
        ensure_ok(&reply)?;
        Ok(reply)
    }

    pub async fn create_route(&self, route: &NewRoute) -> Result<Route, CoreError> {
        let created = self.inner.client.create_route(route).await?;
        info!(route_id = %created.id, "route created");
        Ok(created)
    }

    pub async fn delete_route(&self, id: RouteId) -> Result<Ack, CoreError> {
        let ack = self.inner.client.delete_route(id).await?;
        ensure_ack(&ack)?;
        info!(route_id = %id, "route deleted");
        Ok(ack)
    }

    pub async fn fetch_config(&self) -> Result<DeviceConfig, CoreError> {
        Ok(self.inner.client.get_config().await?)
    }

    pub async fn update_config(
        &self,
        update: &ConfigUpdate,
    ) -> Result<Reply<DeviceConfig>, CoreError> {
        let reply = self.inner.client.update_config(update).await?;
        ensure_ok(&reply)?;
        Ok(reply)
    }

    /// Factory-reset the device configuration and clear both snapshot
    /// stores. Live stores are kept.
    pub async fn reset_config(&self) -> Result<Ack, CoreError> {
        let ack = self.inner.client.reset_config().await?;
        ensure_ack(&ack)?;
        self.inner.store.clear_snapshots();
        info!("device configuration reset");
        Ok(ack)
    }

    pub async fn fetch_system(&self) -> Result<SystemInfo, CoreError> {
        Ok(self.inner.client.get_system().await?)
    }

    // ── State observation ────────────────────────────────────────

    /// Watch one channel's lifecycle. `None` until `start()` has opened
    /// it, or if it is disabled.
    pub fn channel_state(&self, endpoint: ChannelEndpoint) -> Option<watch::Receiver<ChannelState>> {
        lock(&self.inner.channels)
            .iter()
            .find(|c| c.endpoint() == endpoint)
            .map(ChannelHandle::state)
    }

    pub fn last_ports_refresh(&self) -> Option<DateTime<Utc>> {
        self.inner.store.ports.updated_at()
    }

    pub fn last_routes_refresh(&self) -> Option<DateTime<Utc>> {
        self.inner.store.routes.updated_at()
    }

    pub fn last_signal_frame(&self) -> Option<DateTime<Utc>> {
        self.inner.store.signals.updated_at()
    }

    pub fn last_data_flow_frame(&self) -> Option<DateTime<Utc>> {
        self.inner.store.data_flow.updated_at()
    }

    // ── Snapshot accessors (delegate to DeviceStore) ─────────────

    pub fn ports_snapshot(&self) -> Snapshot<Port> {
        self.inner.store.ports.snapshot()
    }

    pub fn routes_snapshot(&self) -> Snapshot<Route> {
        self.inner.store.routes.snapshot()
    }

    pub fn signals_snapshot(&self) -> Arc<SignalState> {
        self.inner.store.signals.snapshot()
    }

    pub fn data_flow_snapshot(&self) -> Arc<DataFlowState> {
        self.inner.store.data_flow.snapshot()
    }

    // ── Stream accessors (delegate to DeviceStore) ───────────────

    pub fn ports(&self) -> StateStream<Snapshot<Port>> {
        self.inner.store.ports.subscribe()
    }

    pub fn routes(&self) -> StateStream<Snapshot<Route>> {
        self.inner.store.routes.subscribe()
    }

    pub fn signals(&self) -> StateStream<Arc<SignalState>> {
        self.inner.store.signals.subscribe()
    }

    pub fn data_flow(&self) -> StateStream<Arc<DataFlowState>> {
        self.inner.store.data_flow.subscribe()
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Fold frames from one channel into the live stores, in arrival order.
async fn fold_task(
    endpoint: ChannelEndpoint,
    mut rx: broadcast::Receiver<Frame>,
    dashboard: Dashboard,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            frame = rx.recv() => match frame {
                Ok(frame) => dashboard.inner.store.apply_frame(&frame),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    // A skipped frame may be the last one for its key; nothing
                    // newer on the channel is guaranteed to replace it.
                    warn!(%endpoint, skipped, "live store fold fell behind, resyncing");
                    if let Err(e) = dashboard.resync_live(endpoint).await {
                        warn!(%endpoint, error = %e, "live store resync failed");
                    }
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
    debug!(%endpoint, "fold task exiting");
}

/// Periodically refresh both snapshots.
async fn refresh_task(dashboard: Dashboard, interval_secs: u64, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                if let Err(e) = dashboard.refresh_all().await {
                    warn!(error = %e, "periodic refresh failed");
                }
            }
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────

fn build_transport(config: &DashboardConfig) -> TransportConfig {
    TransportConfig {
        tls: match &config.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        },
        timeout: config.timeout,
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn ensure_ack(ack: &Ack) -> Result<(), CoreError> {
    if ack.ok {
        Ok(())
    } else {
        Err(CoreError::Rejected {
            message: ack
                .message
                .clone()
                .unwrap_or_else(|| "device answered ok=false".into()),
        })
    }
}

fn ensure_ok<T>(reply: &Reply<T>) -> Result<(), CoreError> {
    match reply {
        Reply::Entity(_) => Ok(()),
        Reply::Ack(ack) => ensure_ack(ack),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn dashboard() -> Dashboard {
        Dashboard::new(DashboardConfig::new("http://127.0.0.1:9".parse().unwrap())).unwrap()
    }

    #[test]
    fn new_does_no_io_and_starts_empty() {
        let d = dashboard();
        assert!(d.ports_snapshot().is_empty());
        assert!(d.routes_snapshot().is_empty());
        assert!(d.signals_snapshot().is_empty());
        assert!(d.data_flow_snapshot().is_empty());
        assert!(d.last_ports_refresh().is_none());
        assert!(d.channel_state(ChannelEndpoint::Signals).is_none());
    }

    #[test]
    fn rejected_ack_is_an_error() {
        let ack = Ack {
            ok: false,
            message: Some("Route not found".into()),
            wifi_changing: None,
        };
        let err = ensure_ack(&ack).unwrap_err();
        assert_eq!(err.to_string(), "Operation rejected by device: Route not found");
        assert!(ensure_ok(&Reply::<Port>::Ack(Ack {
            ok: true,
            ..Ack::default()
        }))
        .is_ok());
    }

    #[tokio::test]
    async fn start_after_shutdown_fails() {
        let d = dashboard();
        d.shutdown().await;
        assert!(d.is_shut_down());
        assert!(matches!(d.start(), Err(CoreError::ShutDown)));
    }

    #[tokio::test]
    async fn lagged_fold_resyncs_signals_from_ports() {
        use serde_json::json;
        use vuart_api::SignalFrame;
        use vuart_api::models::SignalLines;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/ports"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 1, "name": "UART0", "type": 1, "state": 2,
                 "signals": {"dtr": true, "cts": true}}
            ])))
            .expect(1)
            .mount(&server)
            .await;
        let d = Dashboard::new(DashboardConfig::new(server.uri().parse().unwrap())).unwrap();

        let frame = |port: u32| {
            Frame::Signal(SignalFrame {
                port_id: PortId(port),
                signals: SignalLines {
                    rts: true,
                    ..SignalLines::default()
                },
            })
        };

        // Capacity 2: the frames for ports 1 and 2 are overwritten before
        // the fold task reads anything.
        let (tx, rx) = broadcast::channel(2);
        for port in 1..=4 {
            tx.send(frame(port)).unwrap();
        }
        drop(tx);

        fold_task(ChannelEndpoint::Signals, rx, d.clone(), CancellationToken::new()).await;

        let signals = d.signals_snapshot();
        let p1 = signals[&PortId(1)];
        assert!(p1.dtr && p1.cts && !p1.rts);
        assert!(!signals.contains_key(&PortId(2)));
        assert!(signals[&PortId(3)].rts);
        assert!(signals[&PortId(4)].rts);
        assert_eq!(d.ports_snapshot().len(), 1);
    }

    #[tokio::test]
    async fn disabled_channels_are_not_opened() {
        let mut config = DashboardConfig::new("http://127.0.0.1:9".parse().unwrap());
        config.signals_enabled = false;
        config.monitor_enabled = false;
        let d = Dashboard::new(config).unwrap();

        d.start().unwrap();
        assert!(d.channel_state(ChannelEndpoint::Signals).is_none());
        assert!(d.channel_state(ChannelEndpoint::Monitor).is_none());
        d.shutdown().await;
    }
}
