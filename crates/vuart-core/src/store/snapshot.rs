// ── Snapshot store ──
//
// Holds the last successfully fetched list of one entity type. A refresh
// swaps the whole list in one step; readers always see either the old
// list or the new one, never a mix.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use super::Keyed;
use crate::stream::StateStream;

/// Shared, immutable list handed to readers.
pub type Snapshot<T> = Arc<Vec<Arc<T>>>;

/// Wholesale-replaced entity list with push-based change notification.
pub struct SnapshotStore<T: Send + Sync + 'static> {
    snapshot: watch::Sender<Snapshot<T>>,
    updated_at: watch::Sender<Option<DateTime<Utc>>>,
}

impl<T: Send + Sync + 'static> SnapshotStore<T> {
    pub(crate) fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        let (updated_at, _) = watch::channel(None);
        Self {
            snapshot,
            updated_at,
        }
    }

    /// Replace the entire contents. Order is kept as given.
    pub(crate) fn replace(&self, items: Vec<T>) {
        let values: Vec<Arc<T>> = items.into_iter().map(Arc::new).collect();
        // `send_replace` updates unconditionally, even with zero receivers.
        self.snapshot.send_replace(Arc::new(values));
        self.updated_at.send_replace(Some(Utc::now()));
    }

    /// Drop all entries (explicit device reset).
    pub(crate) fn clear(&self) {
        self.snapshot.send_replace(Arc::new(Vec::new()));
        self.updated_at.send_replace(None);
    }

    /// Current list (cheap `Arc` clone).
    pub fn snapshot(&self) -> Snapshot<T> {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> StateStream<Snapshot<T>> {
        StateStream::new(self.snapshot.subscribe())
    }

    /// When the list was last replaced by a refresh; `None` if never, or
    /// since the last clear.
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        *self.updated_at.borrow()
    }

    pub fn len(&self) -> usize {
        self.snapshot.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.borrow().is_empty()
    }
}

impl<T: Keyed + Send + Sync + 'static> SnapshotStore<T> {
    /// Look up one entity by its device-assigned id.
    pub fn get(&self, key: T::Key) -> Option<Arc<T>> {
        self.snapshot
            .borrow()
            .iter()
            .find(|item| item.key() == key)
            .map(Arc::clone)
    }

    /// Ids present in the current list.
    pub fn keys(&self) -> BTreeSet<T::Key> {
        self.snapshot.borrow().iter().map(|item| item.key()).collect()
    }
}
