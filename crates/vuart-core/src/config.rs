// ── Runtime dashboard configuration ──
//
// These types describe *how* to talk to one device. They carry connection
// tuning and live-store policy, but never touch disk. The CLI builds a
// `DashboardConfig` (usually from a vuart-config profile) and hands it in.

use std::time::Duration;

use url::Url;
use vuart_api::ReconnectConfig;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict). Default; the device normally serves plain HTTP.
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed certs).
    DangerAcceptInvalid,
}

/// Configuration for one device dashboard.
///
/// Built by the CLI, passed to `Dashboard` -- core never reads config files.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Device base URL (e.g., `http://192.168.4.1`). Channel URLs are
    /// derived from it (`http` → `ws`, `https` → `wss`).
    pub url: Url,
    /// TLS verification strategy.
    pub tls: TlsVerification,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Channel reconnect schedule.
    pub reconnect: ReconnectConfig,
    /// Run the `/ws/signals` channel.
    pub signals_enabled: bool,
    /// Run the `/ws/monitor` channel.
    pub monitor_enabled: bool,
    /// Send the registration frame after each channel open.
    pub announce_on_open: bool,
    /// Drop live-store keys for ports/routes missing from the latest
    /// snapshot after each refresh. Off by default: live entries stay
    /// until the dashboard is dropped.
    pub prune_stale_live_keys: bool,
    /// How often to refresh ports and routes in the background (seconds).
    /// 0 = only on demand.
    pub refresh_interval_secs: u64,
}

impl DashboardConfig {
    /// Defaults for the device at `url`.
    pub fn new(url: Url) -> Self {
        Self {
            url,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(10),
            reconnect: ReconnectConfig::default(),
            signals_enabled: true,
            monitor_enabled: true,
            announce_on_open: true,
            prune_stale_live_keys: false,
            refresh_interval_secs: 0,
        }
    }
}
