//! Subscriber bookkeeping shared by the store implementations.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::trace;

use super::{StoreEvent, StorePath, Subscription, SubscriptionId};

struct Watcher {
    path: StorePath,
    tx: mpsc::UnboundedSender<StoreEvent>,
}

/// Live subscriptions keyed by id
#[derive(Default)]
pub(crate) struct Watchers {
    next_id: AtomicU64,
    live: Mutex<HashMap<SubscriptionId, Watcher>>,
}

impl Watchers {
    /// Register a watcher and deliver `initial` to it straight away
    pub(crate) fn register(&self, path: StorePath, initial: StoreEvent) -> Subscription {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::unbounded_channel();
        let cancelled = matches!(initial, StoreEvent::Cancelled(_));
        let _ = tx.send(initial);
        if !cancelled {
            self.live.lock().insert(id, Watcher { path, tx });
        }
        Subscription::new(id, rx)
    }

    pub(crate) fn remove(&self, id: SubscriptionId) -> bool {
        self.live.lock().remove(&id).is_some()
    }

    pub(crate) fn count(&self) -> usize {
        self.live.lock().len()
    }

    /// Push an event to every watcher whose path overlaps `changed`.
    /// `read` resolves a watcher path to the event to deliver; a watcher
    /// that receives `Cancelled` is dropped.
    pub(crate) fn notify<R>(&self, changed: &StorePath, read: R)
    where
        R: Fn(&StorePath) -> StoreEvent,
    {
        let mut live = self.live.lock();
        live.retain(|id, watcher| {
            if !watcher.path.overlaps(changed) {
                return true;
            }
            trace!(subscription = id.0, path = %watcher.path, "Notifying watcher");
            let event = read(&watcher.path);
            let cancelled = matches!(event, StoreEvent::Cancelled(_));
            // A closed receiver means the subscriber went away
            watcher.tx.send(event).is_ok() && !cancelled
        });
    }
}
