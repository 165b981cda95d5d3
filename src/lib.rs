//! Fintrack is a web app for tracking personal income and expenses.
//!
//! Users sign in (email/password or Google), record transactions into two
//! collections (incomes and expenses), and view a dashboard with totals, a
//! month-to-date chart, and a filterable transaction table. Every signed-in
//! view reads from a live, merged mirror of both collections that is kept
//! current as the store changes.
//!
//! This library provides a server that directly serves HTML pages.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use tokio::signal;

mod alert;
mod app_state;
mod auth;
mod dashboard;
mod endpoints;
mod html;
mod navigation;
mod not_found;
mod routing;
mod session;
mod store;
mod transaction;

#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use auth::{
    GoogleOAuth, NewUser, PasswordHash, User, UserID, ValidatedPassword, create_user,
    get_user_by_email, get_user_by_id,
};
pub use routing::build_router;
pub use session::{GateEffect, Session, SessionCallback, SessionGate, SessionHub, SessionObserver};
pub use store::{
    Collection, DocumentId, DocumentStore, SnapshotCallback, Subscription, TransactionDraft,
    TransactionRecord, initialize as initialize_db,
};
pub use transaction::{
    CategoryFilter, DateOrder, DayTotals, FeedManager, SeriesPoint, Transaction, TransactionFeed,
    TransactionKind, apply_snapshot, dense_month_series, filter_and_sort, group_by_date,
    net_balance, total_by_kind,
};

use crate::alert::alert_error;
use crate::html::render;

/// An async task that waits for either the ctrl+c or terminate signal,
/// whichever comes first, and then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur during sign-up, sign-in, and sign-out.
///
/// These are caught at the form boundary and rendered as an inline alert; the
/// form stays on screen with the entered values intact.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum AuthError {
    /// The email/password combination did not match a known user.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The email is already registered to another account.
    #[error("the email \"{0}\" is already registered")]
    DuplicateEmail(String),

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// The auth token cookie is missing from the cookie jar in the request.
    #[error("no auth cookie in the cookie jar")]
    CookieMissing,

    /// The auth token could not be parsed, or it has expired.
    #[error("the session token is invalid or expired")]
    InvalidToken,

    /// The OAuth sign-in flow failed or was cancelled.
    ///
    /// The string describes the failing step for the server logs. Clients
    /// only see a generic message.
    #[error("OAuth sign-in failed: {0}")]
    OAuthFailed(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    #[error("hashing failed: {0}")]
    HashingError(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::InvalidCredentials | AuthError::CookieMissing | AuthError::InvalidToken => {
                render(
                    StatusCode::UNAUTHORIZED,
                    alert_error("Not signed in", "Sign in to continue."),
                )
            }
            error => {
                tracing::error!("an unexpected auth error occurred: {error}");
                render(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    alert_error(
                        "Something went wrong",
                        "An unexpected error occurred, check the server logs for more details.",
                    ),
                )
            }
        }
    }
}

/// The errors that may occur when creating, updating, or deleting a
/// transaction record.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum WriteError {
    /// A mutation was attempted without an active session.
    #[error("no active session")]
    NoSession,

    /// The record could not be found for the signed-in owner.
    ///
    /// Also returned when the record exists but belongs to someone else, so
    /// the response does not reveal other users' records.
    #[error("the record could not be found")]
    NotFound,

    /// The amount was negative or not a number.
    ///
    /// Amounts are stored as magnitudes; the sign is implied by whether the
    /// record is an income or an expense.
    #[error("{0} is not a valid amount")]
    InvalidAmount(f64),

    /// The store rejected the write.
    #[error("the store rejected the write: {0}")]
    Rejected(String),

    /// The database connection lock could not be acquired.
    #[error("could not acquire the database lock")]
    StoreUnavailable,
}

impl From<rusqlite::Error> for WriteError {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => WriteError::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {error}");
                WriteError::Rejected(error.to_string())
            }
        }
    }
}

impl IntoResponse for WriteError {
    fn into_response(self) -> Response {
        match self {
            WriteError::NoSession => render(
                StatusCode::UNAUTHORIZED,
                alert_error("Not signed in", "Sign in again to save your changes."),
            ),
            WriteError::NotFound => render(
                StatusCode::NOT_FOUND,
                alert_error(
                    "Record not found",
                    "The transaction could not be found. Try refreshing the \
                    page to see if it has already been deleted.",
                ),
            ),
            WriteError::InvalidAmount(amount) => render(
                StatusCode::BAD_REQUEST,
                alert_error(
                    "Invalid amount",
                    &format!("{amount} is not a valid amount. Enter a number of at least zero."),
                ),
            ),
            error => {
                tracing::error!("an unexpected write error occurred: {error}");
                render(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    alert_error(
                        "Something went wrong",
                        "An unexpected error occurred, check the server logs for more details.",
                    ),
                )
            }
        }
    }
}

/// The errors that may occur when establishing a live query.
///
/// Subscription failures never take the app down: callers log the error and
/// keep showing the last consistent data. There is no automatic reconnect; a
/// fresh page load re-subscribes.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SubscriptionError {
    /// The initial snapshot query failed.
    #[error("live query could not be established: {0}")]
    Establish(String),

    /// The database connection lock could not be acquired.
    #[error("could not acquire the database lock")]
    StoreUnavailable,
}

impl From<rusqlite::Error> for SubscriptionError {
    fn from(value: rusqlite::Error) -> Self {
        SubscriptionError::Establish(value.to_string())
    }
}
