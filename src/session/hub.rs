//! The session hub: the single place sessions are created, destroyed, and
//! observed.
//!
//! Observers subscribe per user and receive the current state immediately,
//! then every subsequent change. Like the store's live queries, callbacks are
//! held behind their own locks and invoked after the hub lock is released, so
//! an observer may call back into the hub.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, Weak},
};

use crate::{auth::UserID, session::Session};

/// A callback invoked with the user's session state: `Some` while signed in,
/// `None` once signed out.
pub type SessionCallback = Box<dyn FnMut(Option<&Session>) + Send>;

type SharedCallback = Arc<Mutex<SessionCallback>>;

struct Observer {
    user_id: UserID,
    callback: SharedCallback,
}

#[derive(Default)]
struct HubInner {
    sessions: HashMap<UserID, Session>,
    next_id: u64,
    observers: HashMap<u64, Observer>,
}

/// Tracks the active session per user and notifies observers of changes.
///
/// Cloning is cheap; clones share the same state.
#[derive(Clone, Default)]
pub struct SessionHub {
    inner: Arc<Mutex<HubInner>>,
}

impl SessionHub {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sign-in and notify the user's observers.
    ///
    /// Signing in over an existing session replaces it, which also refreshes
    /// the display name and photo after an OAuth profile change.
    pub fn sign_in(&self, session: Session) {
        let user_id = session.user_id;

        let watchers = {
            let mut inner = self.inner.lock().expect("session hub poisoned");
            inner.sessions.insert(user_id, session.clone());
            watchers_of(&inner, user_id)
        };

        notify(&watchers, Some(&session));
    }

    /// Destroy the user's session, if any, and notify their observers.
    pub fn sign_out(&self, user_id: UserID) {
        let watchers = {
            let mut inner = self.inner.lock().expect("session hub poisoned");
            if inner.sessions.remove(&user_id).is_none() {
                return;
            }
            watchers_of(&inner, user_id)
        };

        notify(&watchers, None);
    }

    /// The user's current session, if they are signed in.
    pub fn current(&self, user_id: UserID) -> Option<Session> {
        self.inner
            .lock()
            .expect("session hub poisoned")
            .sessions
            .get(&user_id)
            .cloned()
    }

    /// Watch the user's session state.
    ///
    /// The callback is invoked with the current state before this function
    /// returns, and again on every sign-in or sign-out of that user, until
    /// the returned [SessionObserver] is disposed or dropped.
    pub fn on_session_change(&self, user_id: UserID, callback: SessionCallback) -> SessionObserver {
        let callback = Arc::new(Mutex::new(callback));

        let (id, current) = {
            let mut inner = self.inner.lock().expect("session hub poisoned");
            let id = inner.next_id;
            inner.next_id += 1;
            inner.observers.insert(
                id,
                Observer {
                    user_id,
                    callback: Arc::clone(&callback),
                },
            );

            (id, inner.sessions.get(&user_id).cloned())
        };

        (*callback.lock().expect("session callback poisoned"))(current.as_ref());

        SessionObserver {
            id,
            hub: Arc::downgrade(&self.inner),
        }
    }
}

fn watchers_of(inner: &HubInner, user_id: UserID) -> Vec<SharedCallback> {
    inner
        .observers
        .values()
        .filter(|observer| observer.user_id == user_id)
        .map(|observer| Arc::clone(&observer.callback))
        .collect()
}

fn notify(watchers: &[SharedCallback], session: Option<&Session>) {
    for callback in watchers {
        (*callback.lock().expect("session callback poisoned"))(session);
    }
}

/// A handle to an active session observation.
///
/// Dropping the observer stops the notifications; [SessionObserver::dispose]
/// does the same explicitly and is safe to call any number of times.
pub struct SessionObserver {
    id: u64,
    hub: Weak<Mutex<HubInner>>,
}

impl SessionObserver {
    /// Stop observing. Idempotent.
    pub fn dispose(&self) {
        if let Some(inner) = self.hub.upgrade() {
            inner
                .lock()
                .expect("session hub poisoned")
                .observers
                .remove(&self.id);
        }
    }
}

impl Drop for SessionObserver {
    fn drop(&mut self) {
        self.dispose();
    }
}
