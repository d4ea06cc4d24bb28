// ── Device state stores ──
//
// Two snapshot stores (ports, routes) replaced by refreshes, and two live
// stores (signals, data flow) folded from push frames.

mod live;
pub mod reducer;
mod snapshot;

use tracing::debug;
use vuart_api::{DataFlowFrame, Frame, SignalFrame};
use vuart_api::models::{Port, PortId, Route, RouteId};

pub use live::{DataFlowState, FlowCounters, LiveStore, Reducer, SignalState};
pub use reducer::{apply_data_flow_update, apply_signal_update};
pub use snapshot::{Snapshot, SnapshotStore};

/// An entity with a device-assigned id.
pub trait Keyed {
    type Key: Ord + Copy;

    fn key(&self) -> Self::Key;
}

impl Keyed for Port {
    type Key = PortId;

    fn key(&self) -> PortId {
        self.id
    }
}

impl Keyed for Route {
    type Key = RouteId;

    fn key(&self) -> RouteId {
        self.id
    }
}

/// All state the dashboard keeps for one device.
///
/// Readers get `Arc` snapshots or [`StateStream`](crate::StateStream)
/// subscriptions; only the dashboard writes.
pub struct DeviceStore {
    pub ports: SnapshotStore<Port>,
    pub routes: SnapshotStore<Route>,
    pub signals: LiveStore<SignalState>,
    pub data_flow: LiveStore<DataFlowState>,
}

impl DeviceStore {
    pub(crate) fn new() -> Self {
        Self {
            ports: SnapshotStore::new(),
            routes: SnapshotStore::new(),
            signals: LiveStore::new(),
            data_flow: LiveStore::new(),
        }
    }

    /// Route a frame to the live store its discriminant names.
    pub(crate) fn apply_frame(&self, frame: &Frame) {
        match frame {
            Frame::Signal(_) => self.signals.apply(frame, apply_signal_update),
            Frame::DataFlow(_) => self.data_flow.apply(frame, apply_data_flow_update),
            Frame::Unknown(_) => {}
        }
    }

    /// Drop signal entries for ports not in the current port snapshot.
    pub(crate) fn prune_signals(&self) {
        let removed = self.signals.retain_keys(&self.ports.keys());
        if removed > 0 {
            debug!(removed, "pruned signal entries for unknown ports");
        }
    }

    /// Drop counters for routes not in the current route snapshot.
    pub(crate) fn prune_data_flow(&self) {
        let removed = self.data_flow.retain_keys(&self.routes.keys());
        if removed > 0 {
            debug!(removed, "pruned flow counters for unknown routes");
        }
    }

    /// Overwrite signal entries with the lines carried by the current
    /// port snapshot. Ports without signal data are left alone.
    pub(crate) fn resync_signals(&self) {
        for port in self.ports.snapshot().iter() {
            if let Some(signals) = port.signals {
                self.apply_frame(&Frame::Signal(SignalFrame {
                    port_id: port.id,
                    signals,
                }));
            }
        }
    }

    /// Overwrite flow counters with the totals in the current route snapshot.
    pub(crate) fn resync_data_flow(&self) {
        for route in self.routes.snapshot().iter() {
            self.apply_frame(&Frame::DataFlow(DataFlowFrame {
                route_id: route.id,
                bytes_src_to_dst: route.bytes_src_to_dst,
                bytes_dst_to_src: route.bytes_dst_to_src,
            }));
        }
    }

    /// Reset to the post-factory-reset state: snapshots cleared, live
    /// state kept.
    pub(crate) fn clear_snapshots(&self) {
        self.ports.clear();
        self.routes.clear();
    }
}
