// Notification bus: broadcasts status snapshots to subscribers in
// registration order.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex};
use tracing::{trace, warn};

use super::status::StatusSnapshot;

pub type Subscriber = Arc<dyn Fn(&StatusSnapshot) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub struct NotificationBus {
    next_id: AtomicU64,
    subscribers: Mutex<Vec<(SubscriptionId, Subscriber)>>,
    /// Serializes transition + dispatch so snapshots arrive in revision order.
    /// Reentrant: a subscriber may trigger another transition from its callback.
    order: ReentrantMutex<()>,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            subscribers: Mutex::new(Vec::new()),
            order: ReentrantMutex::new(()),
        }
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&StatusSnapshot) + Send + Sync + 'static,
    {
        self.subscribe_arc(Arc::new(callback))
    }

    /// The same callback may be registered more than once; each registration
    /// is invoked.
    fn subscribe_arc(&self, callback: Subscriber) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.lock().push((id, callback));
        id
    }

    /// Returns `false` if `id` was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = self.subscribers.lock();
        let before = subs.len();
        subs.retain(|(sid, _)| *sid != id);
        subs.len() != before
    }

    pub fn len(&self) -> usize {
        self.subscribers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `update` and publish the snapshot it returns, as one ordered step.
    pub fn publish_with<R>(
        &self,
        update: impl FnOnce() -> (R, Option<Arc<StatusSnapshot>>),
    ) -> R {
        let _order = self.order.lock();
        let (result, snapshot) = update();
        if let Some(snapshot) = snapshot {
            self.dispatch(&snapshot);
        }
        result
    }

    #[cfg(test)]
    fn publish(&self, snapshot: &StatusSnapshot) {
        let _order = self.order.lock();
        self.dispatch(snapshot);
    }

    fn dispatch(&self, snapshot: &StatusSnapshot) {
        // Copy the list so callbacks can (un)subscribe without deadlocking.
        let subs = self.subscribers.lock().clone();
        trace!(
            "dispatching revision={} to {} subscribers",
            snapshot.revision,
            subs.len()
        );
        for (id, callback) in subs {
            if catch_unwind(AssertUnwindSafe(|| callback(snapshot))).is_err() {
                warn!("status subscriber {:?} panicked; continuing", id);
            }
        }
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new()
    }
}
