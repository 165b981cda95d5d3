//! Implements a struct that holds the state of the server.

use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use rusqlite::Connection;
use sha2::{Digest, Sha512};
use time::Duration;

use crate::{
    auth::{DEFAULT_COOKIE_DURATION, GoogleOAuth},
    session::SessionHub,
    store::{DocumentStore, initialize},
    transaction::FeedManager,
};

/// The state of the server.
#[derive(Clone)]
pub struct AppState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,

    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,

    /// The durable store for both transaction collections.
    pub store: DocumentStore,

    /// The active sessions.
    pub sessions: SessionHub,

    /// One live transaction feed per signed-in owner.
    pub feeds: FeedManager,

    /// Google sign-in configuration, when configured.
    pub oauth: Option<GoogleOAuth>,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for
    /// the domain models.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(
        db_connection: Connection,
        cookie_secret: &str,
        oauth: Option<GoogleOAuth>,
    ) -> Result<Self, rusqlite::Error> {
        initialize(&db_connection)?;

        let store = DocumentStore::new(Arc::new(Mutex::new(db_connection)));
        let sessions = SessionHub::new();
        let feeds = FeedManager::new(store.clone(), sessions.clone());

        Ok(Self {
            cookie_key: create_cookie_key(cookie_secret),
            cookie_duration: DEFAULT_COOKIE_DURATION,
            store,
            sessions,
            feeds,
            oauth,
        })
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// Create a signing key for cookies from a `secret` string.
pub fn create_cookie_key(secret: &str) -> Key {
    let hash = Sha512::digest(secret);

    Key::from(&hash)
}
