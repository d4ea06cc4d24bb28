// ── Live stores ──
//
// Per-key state folded from push frames. Each frame replaces exactly one
// entry; every write swaps in a new immutable map so readers never see a
// half-applied update.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use vuart_api::Frame;
use vuart_api::models::{PortId, RouteId, SignalLines};

use crate::stream::StateStream;

/// Latest control-line state per port.
pub type SignalState = BTreeMap<PortId, SignalLines>;

/// Latest byte counters per route.
pub type DataFlowState = BTreeMap<RouteId, FlowCounters>;

/// Absolute byte totals for one route, as last reported by the device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct FlowCounters {
    pub bytes_source_to_dest: u64,
    pub bytes_dest_to_source: u64,
}

impl FlowCounters {
    pub fn total(&self) -> u64 {
        self.bytes_source_to_dest.saturating_add(self.bytes_dest_to_source)
    }
}

/// Pure fold step: previous state plus one frame gives the next state.
pub type Reducer<S> = fn(&S, &Frame) -> S;

/// Frame-fed state with push-based change notification.
pub struct LiveStore<S: Send + Sync + 'static> {
    state: watch::Sender<Arc<S>>,
    updated_at: watch::Sender<Option<DateTime<Utc>>>,
}

impl<S: Default + PartialEq + Send + Sync + 'static> LiveStore<S> {
    pub(crate) fn new() -> Self {
        let (state, _) = watch::channel(Arc::new(S::default()));
        let (updated_at, _) = watch::channel(None);
        Self { state, updated_at }
    }

    /// Fold one frame into the state with `reducer`.
    ///
    /// Subscribers are only woken when the state actually changes; the
    /// frame timestamp is recorded either way.
    pub(crate) fn apply(&self, frame: &Frame, reducer: Reducer<S>) {
        self.state.send_if_modified(|current| {
            let next = reducer(current, frame);
            if next == **current {
                false
            } else {
                *current = Arc::new(next);
                true
            }
        });
        self.updated_at.send_replace(Some(Utc::now()));
    }

    /// Current state (cheap `Arc` clone).
    pub fn snapshot(&self) -> Arc<S> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> StateStream<Arc<S>> {
        StateStream::new(self.state.subscribe())
    }

    /// When the last frame was folded in; `None` if none yet.
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        *self.updated_at.borrow()
    }
}

impl<K, V> LiveStore<BTreeMap<K, V>>
where
    K: Ord + Copy + Send + Sync + 'static,
    V: Copy + PartialEq + Send + Sync + 'static,
{
    pub fn get(&self, key: K) -> Option<V> {
        self.state.borrow().get(&key).copied()
    }

    pub fn len(&self) -> usize {
        self.state.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.borrow().is_empty()
    }

    /// Remove every key not in `keep`. Returns how many were dropped.
    pub(crate) fn retain_keys(&self, keep: &BTreeSet<K>) -> usize {
        let mut removed = 0;
        self.state.send_if_modified(|current| {
            let next: BTreeMap<K, V> = current
                .iter()
                .filter(|(k, _)| keep.contains(k))
                .map(|(k, v)| (*k, *v))
                .collect();
            removed = current.len() - next.len();
            if removed == 0 {
                false
            } else {
                *current = Arc::new(next);
                true
            }
        });
        removed
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::reducer::{apply_data_flow_update, apply_signal_update};
    use vuart_api::{DataFlowFrame, SignalFrame};

    fn signal(port: u32, dtr: bool) -> Frame {
        Frame::Signal(SignalFrame {
            port_id: PortId(port),
            signals: SignalLines {
                dtr,
                ..SignalLines::default()
            },
        })
    }

    #[test]
    fn apply_updates_one_key() {
        let store: LiveStore<SignalState> = LiveStore::new();
        store.apply(&signal(1, true), apply_signal_update);
        store.apply(&signal(2, false), apply_signal_update);

        assert_eq!(store.len(), 2);
        assert!(store.get(PortId(1)).unwrap().dtr);
        assert!(!store.get(PortId(2)).unwrap().dtr);
        assert!(store.updated_at().is_some());
    }

    #[test]
    fn identical_frame_does_not_notify() {
        let store: LiveStore<SignalState> = LiveStore::new();
        store.apply(&signal(1, true), apply_signal_update);

        let mut rx = store.state.subscribe();
        rx.borrow_and_update();
        store.apply(&signal(1, true), apply_signal_update);
        assert!(!rx.has_changed().unwrap());

        store.apply(&signal(1, false), apply_signal_update);
        assert!(rx.has_changed().unwrap());
    }

    #[test]
    fn subscriber_wakes_only_on_real_change() {
        use tokio_test::{assert_pending, assert_ready, task};

        let store: LiveStore<SignalState> = LiveStore::new();
        let mut stream = store.subscribe();
        let mut changed = task::spawn(stream.changed());
        assert_pending!(changed.poll());

        // Frames for other kinds are no-ops for this store.
        store.apply(
            &Frame::DataFlow(DataFlowFrame {
                route_id: RouteId(1),
                bytes_src_to_dst: 1,
                bytes_dst_to_src: 1,
            }),
            apply_signal_update,
        );
        assert!(!changed.is_woken());
        assert_pending!(changed.poll());

        store.apply(&signal(4, true), apply_signal_update);
        assert!(changed.is_woken());
        let snap = assert_ready!(changed.poll()).unwrap();
        assert!(snap[&PortId(4)].dtr);
    }

    #[test]
    fn retain_keys_drops_only_missing() {
        let store: LiveStore<DataFlowState> = LiveStore::new();
        for id in 1..=3 {
            store.apply(
                &Frame::DataFlow(DataFlowFrame {
                    route_id: RouteId(id),
                    bytes_src_to_dst: u64::from(id),
                    bytes_dst_to_src: 0,
                }),
                apply_data_flow_update,
            );
        }

        let removed = store.retain_keys(&BTreeSet::from([RouteId(1), RouteId(3), RouteId(9)]));
        assert_eq!(removed, 1);
        assert!(store.get(RouteId(2)).is_none());
        assert_eq!(store.get(RouteId(3)).unwrap().bytes_source_to_dest, 3);
        assert_eq!(store.retain_keys(&BTreeSet::from([RouteId(1), RouteId(3)])), 0);
    }

    #[test]
    fn counters_total_saturates() {
        let c = FlowCounters {
            bytes_source_to_dest: u64::MAX,
            bytes_dest_to_source: 1,
        };
        assert_eq!(c.total(), u64::MAX);
    }
}
