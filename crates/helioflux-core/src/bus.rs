//! Synchronous publish/subscribe fan-out for processed readings.
//!
//! `publish` invokes every registered subscriber in subscription order on
//! the publisher's thread. A panicking subscriber is caught and logged; it
//! never prevents delivery to later subscribers and never propagates to the
//! publisher. Unsubscribing is idempotent.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use crate::reading::ProcessedReading;

type Callback = Arc<dyn Fn(&ProcessedReading) + Send + Sync>;

/// Handle identifying one subscription, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Thread-safe notification bus.
#[derive(Default)]
pub struct NotificationBus {
    subscribers: Mutex<Vec<(SubscriptionId, Callback)>>,
    next_id: Mutex<u64>,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for every subsequently published reading.
    pub fn subscribe(
        &self,
        callback: impl Fn(&ProcessedReading) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let mut next_id = self.next_id.lock().unwrap();
        *next_id += 1;
        let id = SubscriptionId(*next_id);
        drop(next_id);

        self.subscribers
            .lock()
            .unwrap()
            .push((id, Arc::new(callback)));
        id
    }

    /// Remove a subscription by handle. Returns whether it was present;
    /// removing an already-removed subscription is a no-op.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.lock().unwrap();
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }

    /// Deliver a reading to every current subscriber, in subscription order.
    ///
    /// The subscriber list is snapshotted before delivery, so a callback may
    /// subscribe or unsubscribe without deadlocking; such changes take
    /// effect from the next publish.
    pub fn publish(&self, reading: &ProcessedReading) {
        let snapshot: Vec<(SubscriptionId, Callback)> =
            self.subscribers.lock().unwrap().clone();
        for (id, callback) in snapshot {
            if panic::catch_unwind(AssertUnwindSafe(|| callback(reading))).is_err() {
                log::error!(
                    "notification subscriber {:?} panicked on reading {}; continuing fan-out",
                    id,
                    reading.id
                );
            }
        }
    }

    /// Number of current subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().unwrap().len()
    }
}
