//! The sign-in page and the endpoint that handles sign-in requests.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{Form, PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;
use time::Duration;

use crate::{
    AppState, AuthError,
    alert::alert_error,
    auth::{cookie::set_auth_cookie, user::get_user_by_email},
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, LINK_STYLE, auth_card,
        base, loading_spinner,
    },
    session::SessionHub,
};

/// The state needed to sign a user in.
#[derive(Clone)]
pub struct LogInState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    /// The active sessions.
    pub sessions: SessionHub,
    /// The database connection for looking up users.
    pub db_connection: Arc<Mutex<Connection>>,
    /// Whether Google sign-in is configured.
    pub oauth_enabled: bool,
}

impl FromRef<AppState> for LogInState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            sessions: state.sessions.clone(),
            db_connection: Arc::clone(state.store.connection()),
            oauth_enabled: state.oauth.is_some(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<LogInState> for Key {
    fn from_ref(state: &LogInState) -> Self {
        state.cookie_key.clone()
    }
}

fn log_in_form(email: &str, error_message: Option<&str>) -> Markup {
    html! {
        form
            hx-post=(endpoints::LOG_IN_API)
            hx-target="this"
            hx-swap="outerHTML"
            hx-indicator="#indicator"
            class="space-y-4 md:space-y-6"
        {
            @if let Some(error_message) = error_message {
                (alert_error("Could not sign in", error_message))
            }

            div
            {
                label for="email" class=(FORM_LABEL_STYLE) { "Email" }

                input
                    type="email"
                    name="email"
                    id="email"
                    placeholder="you@example.com"
                    value=(email)
                    required
                    tabindex="0"
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="password" class=(FORM_LABEL_STYLE) { "Password" }

                input
                    type="password"
                    name="password"
                    id="password"
                    placeholder="••••••••"
                    required
                    tabindex="0"
                    autofocus[error_message.is_some()]
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            button type="submit" id="submit-button" tabindex="0" class=(BUTTON_PRIMARY_STYLE)
            {
                span class="inline htmx-indicator" id="indicator" { (loading_spinner()) }
                "Sign in"
            }

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Don't have an account? "
                a href=(endpoints::REGISTER_VIEW) tabindex="0" class=(LINK_STYLE) { "Sign up here" }
            }
        }
    }
}

fn google_sign_in_button() -> Markup {
    html! {
        a
            href=(endpoints::OAUTH_GOOGLE)
            class="w-full mt-4 flex items-center justify-center gap-2 py-2 px-4 \
                rounded border border-gray-300 bg-white text-gray-700 \
                hover:bg-gray-50 dark:bg-gray-800 dark:text-gray-200 \
                dark:border-gray-600 dark:hover:bg-gray-700"
        {
            "Sign in with Google"
        }
    }
}

/// The query parameters of the sign-in page.
#[derive(Deserialize)]
pub struct LogInPageQuery {
    /// Set when an earlier sign-in attempt failed outside the form, e.g. an
    /// aborted OAuth flow.
    pub error: Option<String>,
}

/// Display the sign-in page.
pub async fn get_log_in_page(
    State(state): State<LogInState>,
    Query(query): Query<LogInPageQuery>,
) -> Response {
    let oauth_error = query
        .error
        .as_deref()
        .map(|_| alert_error("Could not sign in", "Signing in with Google failed. Please try again."));

    let content = auth_card(
        "Sign in to your account",
        &html! {
            @if let Some(alert) = oauth_error { (alert) }

            (log_in_form("", None))

            @if state.oauth_enabled { (google_sign_in_button()) }
        },
    );

    base("Sign In", &[], &content).into_response()
}

/// The form data for signing in.
#[derive(Debug, Deserialize)]
pub struct LogInForm {
    /// The user's email address.
    pub email: String,
    /// The user's password.
    pub password: String,
}

/// A route handler for signing in, redirects to the dashboard on success.
///
/// On failure the sign-in form is re-rendered with an inline alert and the
/// entered email intact.
pub async fn post_log_in(
    State(state): State<LogInState>,
    jar: PrivateCookieJar,
    Form(form): Form<LogInForm>,
) -> Response {
    match verify_credentials(&state, &form) {
        Ok(session) => {
            state.sessions.sign_in(session.clone());

            match set_auth_cookie(jar, session.user_id, state.cookie_duration) {
                Ok(jar) => (
                    jar,
                    HxRedirect(endpoints::DASHBOARD_VIEW.to_owned()),
                    StatusCode::SEE_OTHER,
                )
                    .into_response(),
                Err(error) => {
                    tracing::error!("could not set auth cookie: {error}");
                    log_in_failure(&form.email, "Something went wrong. Please try again.")
                }
            }
        }
        Err(AuthError::InvalidCredentials) => log_in_failure(
            &form.email,
            "Invalid email or password. Please try again.",
        ),
        Err(error) => {
            tracing::error!("sign-in failed: {error}");
            log_in_failure(&form.email, "Something went wrong. Please try again.")
        }
    }
}

fn verify_credentials(
    state: &LogInState,
    form: &LogInForm,
) -> Result<crate::session::Session, AuthError> {
    let connection = state.db_connection.lock().map_err(|_| {
        tracing::error!("could not acquire the database lock to sign in");
        AuthError::InvalidCredentials
    })?;

    let user = get_user_by_email(&form.email, &connection)
        .map_err(|error| {
            tracing::error!("could not look up user: {error}");
            AuthError::InvalidCredentials
        })?
        .ok_or(AuthError::InvalidCredentials)?;

    let password_hash = user
        .password_hash
        .as_ref()
        .ok_or(AuthError::InvalidCredentials)?;

    match password_hash.verify(&form.password) {
        Ok(true) => Ok(user.session()),
        Ok(false) => Err(AuthError::InvalidCredentials),
        Err(error) => {
            tracing::error!("could not verify password: {error}");
            Err(AuthError::InvalidCredentials)
        }
    }
}

fn log_in_failure(email: &str, message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        log_in_form(email, Some(message)),
    )
        .into_response()
}

#[cfg(test)]
mod log_in_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Router, routing::post};
    use axum_extra::extract::cookie::Key;
    use axum_test::TestServer;
    use rusqlite::Connection;
    use sha2::{Digest, Sha512};
    use time::Duration;

    use crate::{
        auth::{
            PasswordHash, ValidatedPassword,
            cookie::COOKIE_TOKEN,
            user::{NewUser, create_user},
        },
        endpoints,
        session::SessionHub,
        store::initialize,
        test_utils::parse_html_fragment,
    };

    use super::{LogInState, post_log_in};

    const TEST_PASSWORD: &str = "averysecretpassword";

    fn get_test_state() -> LogInState {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        create_user(
            NewUser {
                email: "foo@bar.baz".to_owned(),
                display_name: "Ferris".to_owned(),
                photo_url: None,
                password_hash: Some(PasswordHash::new(ValidatedPassword::new_unchecked(TEST_PASSWORD), 4).unwrap()),
            },
            &conn,
        )
        .unwrap();

        let hash = Sha512::digest("nafstenoas");
        LogInState {
            cookie_key: Key::from(&hash),
            cookie_duration: Duration::minutes(5),
            sessions: SessionHub::new(),
            db_connection: Arc::new(Mutex::new(conn)),
            oauth_enabled: false,
        }
    }

    fn get_test_server(state: LogInState) -> TestServer {
        let app = Router::new()
            .route(endpoints::LOG_IN_API, post(post_log_in))
            .with_state(state);

        TestServer::try_new(app).expect("Could not create test server.")
    }

    #[tokio::test]
    async fn log_in_sets_cookie_session_and_redirect() {
        let state = get_test_state();
        let server = get_test_server(state.clone());

        let response = server
            .post(endpoints::LOG_IN_API)
            .form(&[("email", "foo@bar.baz"), ("password", TEST_PASSWORD)])
            .await;

        response.assert_status_see_other();
        assert_eq!(response.header("hx-redirect"), endpoints::DASHBOARD_VIEW);
        assert!(response.maybe_cookie(COOKIE_TOKEN).is_some());

        let session = state.sessions.current(crate::auth::UserID::new(1)).unwrap();
        assert_eq!(session.display_name, "Ferris");
    }

    #[tokio::test]
    async fn wrong_password_rerenders_form_with_email_kept() {
        let state = get_test_state();
        let server = get_test_server(state.clone());

        let response = server
            .post(endpoints::LOG_IN_API)
            .form(&[("email", "foo@bar.baz"), ("password", "wrong")])
            .await;

        response.assert_status(axum::http::StatusCode::UNAUTHORIZED);
        assert!(response.maybe_cookie(COOKIE_TOKEN).is_none());

        let html = parse_html_fragment(response.text());
        let email_input = html
            .select(&scraper::Selector::parse("input[name=email]").unwrap())
            .next()
            .expect("expected the form to be re-rendered");
        assert_eq!(email_input.value().attr("value"), Some("foo@bar.baz"));
        assert!(response.text().contains("Invalid email or password"));
    }

    #[tokio::test]
    async fn unknown_email_is_rejected_like_a_wrong_password() {
        let server = get_test_server(get_test_state());

        let response = server
            .post(endpoints::LOG_IN_API)
            .form(&[("email", "nobody@bar.baz"), ("password", TEST_PASSWORD)])
            .await;

        response.assert_status(axum::http::StatusCode::UNAUTHORIZED);
        assert!(response.text().contains("Invalid email or password"));
    }
}
