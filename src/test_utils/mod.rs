#![allow(missing_docs)]

//! Shared helpers for the crate's tests.

use axum::response::Response;
use rusqlite::Connection;
use scraper::Html;
use time::Date;

use crate::{
    auth::{NewUser, PasswordHash, UserID, create_user},
    store::TransactionDraft,
};

/// Insert a user and return their ID. The password hash is a placeholder;
/// use the register endpoint in tests that need to sign in for real.
pub(crate) fn create_test_user(connection: &Connection, email: &str) -> UserID {
    create_user(
        NewUser {
            email: email.to_owned(),
            display_name: "Ferris".to_owned(),
            photo_url: None,
            password_hash: Some(PasswordHash::new_unchecked("not a real hash")),
        },
        connection,
    )
    .expect("could not create test user")
    .id
}

/// A transaction draft with an empty description.
pub(crate) fn draft(date: Date, category: &str, amount: f64) -> TransactionDraft {
    TransactionDraft {
        date,
        category: category.to_owned(),
        amount,
        description: String::new(),
    }
}

/// Parse an HTML fragment response body.
pub(crate) fn parse_html_fragment(text: String) -> Html {
    Html::parse_fragment(&text)
}

/// Collect a response body into a string.
pub(crate) async fn body_text(response: Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Could not get response body");

    String::from_utf8_lossy(&body).to_string()
}
