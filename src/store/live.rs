//! The live-query registry: keeps track of who is watching which collection
//! and hands out cancellation guards.
//!
//! Snapshots are always full replacements, never diffs. The registry holds
//! each callback behind its own lock so snapshots can be dispatched without
//! holding the registry lock, which lets callbacks subscribe or cancel other
//! subscriptions without deadlocking.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, Weak},
};

use crate::{
    auth::UserID,
    store::records::{Collection, TransactionRecord},
};

/// A callback invoked with a full snapshot of the watched result set.
pub type SnapshotCallback = Box<dyn FnMut(Vec<TransactionRecord>) + Send>;

pub(crate) type SharedCallback = Arc<Mutex<SnapshotCallback>>;

struct Subscriber {
    collection: Collection,
    owner_id: UserID,
    callback: SharedCallback,
}

#[derive(Default)]
struct RegistryInner {
    next_id: u64,
    subscribers: HashMap<u64, Subscriber>,
}

/// The set of active live queries for a [DocumentStore](super::DocumentStore).
#[derive(Default)]
pub(crate) struct LiveQueries {
    inner: Mutex<RegistryInner>,
}

impl LiveQueries {
    /// Register a callback for `collection` filtered by `owner_id`.
    ///
    /// Returns the guard to hand to the caller and the shared callback so
    /// the store can deliver the initial snapshot.
    pub(crate) fn register(
        self: &Arc<Self>,
        collection: Collection,
        owner_id: UserID,
        callback: SnapshotCallback,
    ) -> (Subscription, SharedCallback) {
        let callback = Arc::new(Mutex::new(callback));

        let mut inner = self.inner.lock().expect("live query registry poisoned");
        let id = inner.next_id;
        inner.next_id += 1;
        inner.subscribers.insert(
            id,
            Subscriber {
                collection,
                owner_id,
                callback: Arc::clone(&callback),
            },
        );

        (
            Subscription {
                id,
                registry: Arc::downgrade(self),
            },
            callback,
        )
    }

    /// The callbacks currently watching `collection`, paired with the owner
    /// each one filters by.
    pub(crate) fn watchers_of(&self, collection: Collection) -> Vec<(SharedCallback, UserID)> {
        let inner = self.inner.lock().expect("live query registry poisoned");

        inner
            .subscribers
            .values()
            .filter(|subscriber| subscriber.collection == collection)
            .map(|subscriber| (Arc::clone(&subscriber.callback), subscriber.owner_id))
            .collect()
    }

    fn remove(&self, id: u64) {
        let mut inner = self.inner.lock().expect("live query registry poisoned");
        inner.subscribers.remove(&id);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.inner
            .lock()
            .expect("live query registry poisoned")
            .subscribers
            .len()
    }
}

/// A handle to an active live query.
///
/// Dropping the subscription cancels it; [Subscription::cancel] does the same
/// explicitly and is safe to call any number of times. After cancellation the
/// callback receives no further snapshots.
pub struct Subscription {
    id: u64,
    registry: Weak<LiveQueries>,
}

impl Subscription {
    /// Stop the live query. Idempotent.
    pub fn cancel(&self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}
