//! The live transaction feed: a merged, owner-scoped mirror of both
//! collections.
//!
//! A feed opens one live query per collection and folds every snapshot into
//! its mirror with the pure [apply_snapshot] reducer: the last full snapshot
//! per kind wins, items of the other kind are untouched. Individual records
//! are never merged.
//!
//! Each subscription captures the feed generation it was opened for. A
//! snapshot whose generation no longer matches the feed's is discarded, so a
//! late delivery for a previous owner can never contaminate the mirror after
//! a session switch. [FeedManager] pairs every feed with a session observer
//! that invalidates and discards the mirror the moment its owner signs out.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, Weak,
        atomic::{AtomicU64, Ordering},
    },
};

use crate::{
    SubscriptionError,
    auth::UserID,
    session::{SessionHub, SessionObserver},
    store::{DocumentStore, Subscription, TransactionRecord},
    transaction::model::{Transaction, TransactionKind},
};

/// Fold one collection snapshot into the merged mirror.
///
/// Replaces every item whose kind matches the snapshot's source collection
/// with the snapshot's records, leaving items of the other kind untouched.
pub fn apply_snapshot(
    mirror: Vec<Transaction>,
    kind: TransactionKind,
    records: Vec<TransactionRecord>,
) -> Vec<Transaction> {
    let mut next: Vec<Transaction> = mirror
        .into_iter()
        .filter(|transaction| transaction.kind != kind)
        .collect();

    next.extend(
        records
            .into_iter()
            .map(|record| Transaction::from_record(record, kind)),
    );

    next
}

/// The shared mutable half of a feed: the mirror plus the generation the
/// open subscriptions must match.
struct FeedState {
    generation: AtomicU64,
    revision: AtomicU64,
    mirror: Mutex<Vec<Transaction>>,
}

impl FeedState {
    fn new() -> Self {
        Self {
            generation: AtomicU64::new(0),
            revision: AtomicU64::new(0),
            mirror: Mutex::new(Vec::new()),
        }
    }

    /// Fold a snapshot into the mirror, unless it belongs to a superseded
    /// generation.
    fn apply(&self, generation: u64, kind: TransactionKind, records: Vec<TransactionRecord>) {
        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!("discarding stale {kind} snapshot from generation {generation}");
            return;
        }

        let mut mirror = self.mirror.lock().expect("feed mirror poisoned");
        let merged = apply_snapshot(std::mem::take(&mut *mirror), kind, records);
        *mirror = merged;

        self.revision.fetch_add(1, Ordering::SeqCst);
    }

    fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.mirror.lock().expect("feed mirror poisoned").clear();
    }
}

/// A live, merged view of one owner's incomes and expenses.
pub struct TransactionFeed {
    owner_id: Option<UserID>,
    state: Arc<FeedState>,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl TransactionFeed {
    /// Open a feed for `owner_id`: one live query per collection, merged into
    /// a single mirror.
    ///
    /// The mirror holds the current state of both collections before this
    /// function returns.
    ///
    /// # Errors
    /// This function will return a [SubscriptionError] if either live query
    /// cannot be established. Any query opened before the failure is
    /// cancelled.
    pub fn subscribe(store: &DocumentStore, owner_id: UserID) -> Result<Self, SubscriptionError> {
        let state = Arc::new(FeedState::new());
        let generation = state.generation.load(Ordering::SeqCst);

        let mut subscriptions = Vec::with_capacity(TransactionKind::ALL.len());
        for kind in TransactionKind::ALL {
            let state = Arc::clone(&state);
            let subscription = store.subscribe(
                kind.collection(),
                owner_id,
                Box::new(move |records| state.apply(generation, kind, records)),
            )?;

            subscriptions.push(subscription);
        }

        Ok(Self {
            owner_id: Some(owner_id),
            state,
            subscriptions: Mutex::new(subscriptions),
        })
    }

    /// A feed with no owner: no subscriptions, permanently empty.
    ///
    /// Used when there is no active session, so consumers can treat "signed
    /// out" and "no transactions" uniformly.
    pub fn detached() -> Self {
        Self {
            owner_id: None,
            state: Arc::new(FeedState::new()),
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    /// The owner this feed is scoped to, if any.
    pub fn owner_id(&self) -> Option<UserID> {
        self.owner_id
    }

    /// A point-in-time copy of the merged mirror.
    pub fn snapshot(&self) -> Vec<Transaction> {
        self.state.mirror.lock().expect("feed mirror poisoned").clone()
    }

    /// A counter that increases every time a snapshot is folded in. Lets
    /// pollers cheaply detect "nothing changed".
    pub fn revision(&self) -> u64 {
        self.state.revision.load(Ordering::SeqCst)
    }

    /// Stop both live queries and discard the mirror. Idempotent.
    ///
    /// Also bumps the feed generation, so a snapshot already dispatched to
    /// this feed's callbacks is discarded instead of applied.
    pub fn invalidate(&self) {
        self.state.invalidate();

        let mut subscriptions = self.subscriptions.lock().expect("feed subscriptions poisoned");
        for subscription in subscriptions.drain(..) {
            subscription.cancel();
        }
    }
}

impl Drop for TransactionFeed {
    fn drop(&mut self) {
        self.invalidate();
    }
}

struct FeedEntry {
    feed: Arc<TransactionFeed>,
    // Held so the sign-out observer lives exactly as long as the feed.
    _observer: SessionObserver,
}

type FeedMap = Mutex<HashMap<UserID, FeedEntry>>;

/// Hands out one live feed per signed-in owner and discards it on sign-out.
///
/// Cloning is cheap; clones share the same feeds.
#[derive(Clone)]
pub struct FeedManager {
    store: DocumentStore,
    sessions: SessionHub,
    feeds: Arc<FeedMap>,
}

impl FeedManager {
    /// Create a manager over the store, disposing feeds through `sessions`
    /// sign-out notifications.
    pub fn new(store: DocumentStore, sessions: SessionHub) -> Self {
        Self {
            store,
            sessions,
            feeds: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The live feed for `owner_id`, opening it on first use.
    ///
    /// Without an active session this returns a detached, empty feed and
    /// opens no subscriptions.
    ///
    /// # Errors
    /// This function will return a [SubscriptionError] if a fresh feed's
    /// live queries cannot be established.
    pub fn feed_for(&self, owner_id: UserID) -> Result<Arc<TransactionFeed>, SubscriptionError> {
        if self.sessions.current(owner_id).is_none() {
            return Ok(Arc::new(TransactionFeed::detached()));
        }

        if let Some(entry) = self.feeds.lock().expect("feed map poisoned").get(&owner_id) {
            return Ok(Arc::clone(&entry.feed));
        }

        let feed = Arc::new(TransactionFeed::subscribe(&self.store, owner_id)?);

        let feeds = Arc::downgrade(&self.feeds);
        let observer = self.sessions.on_session_change(
            owner_id,
            Box::new(move |session| {
                if session.is_none() {
                    dispose(&feeds, owner_id);
                }
            }),
        );

        {
            let mut feeds = self.feeds.lock().expect("feed map poisoned");
            // Another request may have raced us here; reuse theirs.
            if let Some(entry) = feeds.get(&owner_id) {
                return Ok(Arc::clone(&entry.feed));
            }

            feeds.insert(
                owner_id,
                FeedEntry {
                    feed: Arc::clone(&feed),
                    _observer: observer,
                },
            );
        }

        // The session may have ended between the check above and the insert;
        // the observer fired into an empty map in that case, so re-check.
        if self.sessions.current(owner_id).is_none() {
            dispose(&Arc::downgrade(&self.feeds), owner_id);
            return Ok(Arc::new(TransactionFeed::detached()));
        }

        Ok(feed)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.feeds.lock().expect("feed map poisoned").len()
    }
}

fn dispose(feeds: &Weak<FeedMap>, owner_id: UserID) {
    let Some(feeds) = feeds.upgrade() else {
        return;
    };

    let removed = feeds.lock().expect("feed map poisoned").remove(&owner_id);
    if let Some(entry) = removed {
        entry.feed.invalidate();
    }
}
