// vuart-core: Device state sync between vuart-api and consumers (CLI).

pub mod config;
pub mod dashboard;
pub mod error;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{DashboardConfig, TlsVerification};
pub use dashboard::Dashboard;
pub use error::CoreError;
pub use store::{
    DataFlowState, DeviceStore, FlowCounters, SignalState, Snapshot, apply_data_flow_update,
    apply_signal_update,
};
pub use stream::{StateStream, StateWatchStream};

// Wire types consumers need alongside the dashboard.
pub use vuart_api::models::{
    Ack, ConfigUpdate, DeviceConfig, LineCoding, LineCodingUpdate, NewRoute, Port,
    PortConfigUpdate, PortId, PortState, PortType, Reply, Route, RouteId, RouteType,
    SignalLine, SignalLines, SignalOverrides, SystemInfo, TcpConfig, WifiCredentials,
};
pub use vuart_api::{ChannelEndpoint, ChannelState, Frame, ReconnectConfig};
