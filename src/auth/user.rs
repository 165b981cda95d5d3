//! User accounts and the queries that manage them.
//!
//! A user either has a password hash (email/password sign-up) or none at all
//! (created through OAuth sign-in, where the identity provider vouches for
//! them).

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{AuthError, auth::PasswordHash, session::Session};

/// The ID of a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserID(i64);

impl UserID {
    /// Create a user ID from a raw integer.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// The raw integer for database queries.
    pub fn as_i64(self) -> i64 {
        self.0
    }
}

/// A registered user.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// The ID of the user.
    pub id: UserID,
    /// The user's email address, unique across accounts.
    pub email: String,
    /// The name shown in the header and greeting.
    pub display_name: String,
    /// Profile picture, when the identity provider supplied one.
    pub photo_url: Option<String>,
    /// The user's hashed password. `None` for accounts created via OAuth.
    pub password_hash: Option<PasswordHash>,
}

impl User {
    /// The session this user gets on a successful sign-in.
    pub fn session(&self) -> Session {
        Session {
            user_id: self.id,
            display_name: self.display_name.clone(),
            photo_url: self.photo_url.clone(),
        }
    }
}

/// The fields needed to create a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// The user's email address.
    pub email: String,
    /// The name shown in the header and greeting.
    pub display_name: String,
    /// Profile picture, when the identity provider supplied one.
    pub photo_url: Option<String>,
    /// The user's hashed password. `None` for accounts created via OAuth.
    pub password_hash: Option<PasswordHash>,
}

/// Create the user table.
///
/// # Errors
/// Returns an error if there is an SQL error.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL UNIQUE,
                display_name TEXT NOT NULL,
                photo_url TEXT,
                password_hash TEXT
                )",
        (),
    )?;

    Ok(())
}

/// Create a new user account.
///
/// # Errors
/// This function will return a:
/// - [AuthError::DuplicateEmail] if the email is already registered,
/// - or [AuthError::InvalidCredentials] if there is some other SQL error
///   (logged server-side; the client only learns the sign-up failed).
pub fn create_user(new_user: NewUser, connection: &Connection) -> Result<User, AuthError> {
    let result = connection
        .prepare(
            "INSERT INTO user (email, display_name, photo_url, password_hash)
             VALUES (?1, ?2, ?3, ?4)
             RETURNING id, email, display_name, photo_url, password_hash",
        )
        .and_then(|mut statement| {
            statement.query_row(
                (
                    &new_user.email,
                    &new_user.display_name,
                    &new_user.photo_url,
                    new_user.password_hash.as_ref().map(|hash| hash.to_string()),
                ),
                map_user_row,
            )
        });

    result.map_err(|error| match error {
        rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
            if sql_error.extended_code == 2067 && desc.contains("email") =>
        {
            AuthError::DuplicateEmail(new_user.email.clone())
        }
        error => {
            tracing::error!("could not create user: {error}");
            AuthError::InvalidCredentials
        }
    })
}

/// Retrieve a user by their email address.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub fn get_user_by_email(
    email: &str,
    connection: &Connection,
) -> Result<Option<User>, rusqlite::Error> {
    let result = connection
        .prepare(
            "SELECT id, email, display_name, photo_url, password_hash
             FROM user WHERE email = :email",
        )?
        .query_row(&[(":email", &email)], map_user_row);

    match result {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(error) => Err(error),
    }
}

/// Retrieve a user by their ID.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub fn get_user_by_id(id: UserID, connection: &Connection) -> Result<Option<User>, rusqlite::Error> {
    let result = connection
        .prepare(
            "SELECT id, email, display_name, photo_url, password_hash
             FROM user WHERE id = :id",
        )?
        .query_row(&[(":id", &id.as_i64())], map_user_row);

    match result {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(error) => Err(error),
    }
}

/// Find or create the account for an OAuth profile, refreshing the display
/// name and photo from the provider on every sign-in.
///
/// # Errors
/// This function will return an [AuthError] if the account cannot be read or
/// written.
pub fn upsert_oauth_user(
    email: &str,
    display_name: &str,
    photo_url: Option<&str>,
    connection: &Connection,
) -> Result<User, AuthError> {
    let existing = get_user_by_email(email, connection).map_err(|error| {
        tracing::error!("could not look up user {email}: {error}");
        AuthError::OAuthFailed("user lookup failed".to_owned())
    })?;

    match existing {
        Some(user) => {
            connection
                .execute(
                    "UPDATE user SET display_name = ?1, photo_url = ?2 WHERE id = ?3",
                    (display_name, photo_url, user.id.as_i64()),
                )
                .map_err(|error| {
                    tracing::error!("could not refresh profile for {email}: {error}");
                    AuthError::OAuthFailed("profile refresh failed".to_owned())
                })?;

            Ok(User {
                display_name: display_name.to_owned(),
                photo_url: photo_url.map(str::to_owned),
                ..user
            })
        }
        None => create_user(
            NewUser {
                email: email.to_owned(),
                display_name: display_name.to_owned(),
                photo_url: photo_url.map(str::to_owned),
                password_hash: None,
            },
            connection,
        ),
    }
}

/// Map a database row to a [User].
pub fn map_user_row(row: &Row) -> Result<User, rusqlite::Error> {
    let password_hash: Option<String> = row.get(4)?;

    Ok(User {
        id: UserID::new(row.get(0)?),
        email: row.get(1)?,
        display_name: row.get(2)?,
        photo_url: row.get(3)?,
        password_hash: password_hash
            .as_deref()
            .map(PasswordHash::new_unchecked),
    })
}

#[cfg(test)]
mod user_query_tests {
    use rusqlite::Connection;

    use crate::{AuthError, auth::PasswordHash, store::initialize};

    use super::{NewUser, create_user, get_user_by_email, get_user_by_id, upsert_oauth_user};

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_owned(),
            display_name: "Ferris".to_owned(),
            photo_url: None,
            password_hash: Some(PasswordHash::new_unchecked("not a real hash")),
        }
    }

    #[test]
    fn create_and_get_by_email() {
        let conn = get_test_connection();

        let created = create_user(new_user("foo@bar.baz"), &conn).unwrap();
        let fetched = get_user_by_email("foo@bar.baz", &conn).unwrap();

        assert_eq!(fetched, Some(created));
    }

    #[test]
    fn create_fails_on_duplicate_email() {
        let conn = get_test_connection();
        create_user(new_user("foo@bar.baz"), &conn).unwrap();

        let result = create_user(new_user("foo@bar.baz"), &conn);

        assert_eq!(
            result,
            Err(AuthError::DuplicateEmail("foo@bar.baz".to_owned()))
        );
    }

    #[test]
    fn get_by_email_returns_none_for_unknown_user() {
        let conn = get_test_connection();

        assert_eq!(get_user_by_email("nobody@bar.baz", &conn).unwrap(), None);
    }

    #[test]
    fn get_by_id_round_trips() {
        let conn = get_test_connection();
        let created = create_user(new_user("foo@bar.baz"), &conn).unwrap();

        let fetched = get_user_by_id(created.id, &conn).unwrap();

        assert_eq!(fetched, Some(created));
    }

    #[test]
    fn oauth_upsert_creates_account_without_password() {
        let conn = get_test_connection();

        let user = upsert_oauth_user(
            "oauth@bar.baz",
            "Ferris",
            Some("https://example.com/ferris.png"),
            &conn,
        )
        .unwrap();

        assert_eq!(user.password_hash, None);
        assert_eq!(user.photo_url.as_deref(), Some("https://example.com/ferris.png"));
    }

    #[test]
    fn oauth_upsert_refreshes_existing_profile() {
        let conn = get_test_connection();
        let created = create_user(new_user("foo@bar.baz"), &conn).unwrap();

        let updated = upsert_oauth_user("foo@bar.baz", "Ferris C.", None, &conn).unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.display_name, "Ferris C.");
        // The password survives so email sign-in keeps working.
        assert_eq!(
            get_user_by_id(created.id, &conn).unwrap().unwrap().password_hash,
            created.password_hash
        );
    }

    #[test]
    fn session_carries_the_profile() {
        let conn = get_test_connection();
        let user = create_user(new_user("foo@bar.baz"), &conn).unwrap();

        let session = user.session();

        assert_eq!(session.user_id, user.id);
        assert_eq!(session.display_name, "Ferris");
    }
}
