//! The sign-up page and the endpoint that creates new accounts.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
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
    auth::{
        PasswordHash,
        cookie::set_auth_cookie,
        user::{NewUser, create_user},
    },
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, LINK_STYLE, auth_card,
        base, loading_spinner,
    },
    session::SessionHub,
};

/// The state needed to register a new user.
#[derive(Clone)]
pub struct RegisterState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    /// The active sessions.
    pub sessions: SessionHub,
    /// The database connection for creating users.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for RegisterState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            sessions: state.sessions.clone(),
            db_connection: Arc::clone(state.store.connection()),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<RegisterState> for Key {
    fn from_ref(state: &RegisterState) -> Self {
        state.cookie_key.clone()
    }
}

/// The minimum number of characters the password input accepts client side.
/// Server-side strength validation is done on top of this.
const PASSWORD_INPUT_MIN_LENGTH: u8 = 12;

fn registration_form(display_name: &str, email: &str, error_message: Option<&str>) -> Markup {
    html! {
        form
            hx-post=(endpoints::USERS)
            hx-target="this"
            hx-swap="outerHTML"
            hx-indicator="#indicator"
            class="space-y-4 md:space-y-6"
        {
            @if let Some(error_message) = error_message {
                (alert_error("Could not sign up", error_message))
            }

            div
            {
                label for="display-name" class=(FORM_LABEL_STYLE) { "Username" }

                input
                    type="text"
                    name="display_name"
                    id="display-name"
                    placeholder="Your name"
                    value=(display_name)
                    required
                    tabindex="0"
                    class=(FORM_TEXT_INPUT_STYLE);
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
                    minlength=(PASSWORD_INPUT_MIN_LENGTH)
                    tabindex="0"
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="confirm-password" class=(FORM_LABEL_STYLE) { "Confirm Password" }

                input
                    type="password"
                    name="confirm_password"
                    id="confirm-password"
                    placeholder="••••••••"
                    required
                    minlength=(PASSWORD_INPUT_MIN_LENGTH)
                    tabindex="0"
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            button type="submit" id="submit-button" tabindex="0" class=(BUTTON_PRIMARY_STYLE)
            {
                span class="inline htmx-indicator" id="indicator" { (loading_spinner()) }
                "Sign up"
            }

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Already have an account? "
                a href=(endpoints::LOG_IN_VIEW) tabindex="0" class=(LINK_STYLE) { "Sign in here" }
            }
        }
    }
}

/// Display the sign-up page.
pub async fn get_register_page() -> Response {
    let content = auth_card("Create your account", &registration_form("", "", None));

    base("Sign Up", &[], &content).into_response()
}

/// The form data for creating an account.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    /// The name shown in the header and greeting.
    pub display_name: String,
    /// The user's email address.
    pub email: String,
    /// The user's password.
    pub password: String,
    /// The password, again, to catch typos.
    pub confirm_password: String,
}

/// A route handler for creating a new account, signs the user in and
/// redirects to the dashboard on success.
pub async fn register_user(
    State(state): State<RegisterState>,
    jar: PrivateCookieJar,
    Form(form): Form<RegisterForm>,
) -> Response {
    if let Err(message) = validate_form(&form) {
        return registration_failure(&form, StatusCode::UNPROCESSABLE_ENTITY, &message);
    }

    let password_hash = match PasswordHash::from_raw_password(&form.password, PasswordHash::DEFAULT_COST)
    {
        Ok(hash) => hash,
        Err(AuthError::TooWeak(feedback)) => {
            return registration_failure(&form, StatusCode::UNPROCESSABLE_ENTITY, &feedback);
        }
        Err(error) => {
            tracing::error!("could not hash password: {error}");
            return registration_failure(
                &form,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something went wrong. Please try again.",
            );
        }
    };

    let user = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(_) => {
                tracing::error!("could not acquire the database lock to register");
                return registration_failure(
                    &form,
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong. Please try again.",
                );
            }
        };

        create_user(
            NewUser {
                email: form.email.trim().to_owned(),
                display_name: form.display_name.trim().to_owned(),
                photo_url: None,
                password_hash: Some(password_hash),
            },
            &connection,
        )
    };

    match user {
        Ok(user) => {
            state.sessions.sign_in(user.session());

            match set_auth_cookie(jar, user.id, state.cookie_duration) {
                Ok(jar) => (
                    jar,
                    HxRedirect(endpoints::DASHBOARD_VIEW.to_owned()),
                    StatusCode::SEE_OTHER,
                )
                    .into_response(),
                Err(error) => {
                    tracing::error!("could not set auth cookie: {error}");
                    registration_failure(
                        &form,
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Your account was created but signing in failed. Try signing in.",
                    )
                }
            }
        }
        Err(AuthError::DuplicateEmail(email)) => registration_failure(
            &form,
            StatusCode::CONFLICT,
            &format!("{email} is already registered. Try signing in instead."),
        ),
        Err(error) => {
            tracing::error!("could not create user: {error}");
            registration_failure(
                &form,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something went wrong. Please try again.",
            )
        }
    }
}

fn validate_form(form: &RegisterForm) -> Result<(), String> {
    if form.display_name.trim().is_empty() {
        return Err("Enter a username.".to_owned());
    }

    let email = form.email.trim();
    let plausible_email = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !plausible_email {
        return Err(format!("\"{email}\" does not look like an email address."));
    }

    if form.password != form.confirm_password {
        return Err("The passwords do not match.".to_owned());
    }

    Ok(())
}

fn registration_failure(form: &RegisterForm, status_code: StatusCode, message: &str) -> Response {
    (
        status_code,
        registration_form(&form.display_name, &form.email, Some(message)),
    )
        .into_response()
}

#[cfg(test)]
mod register_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Router, routing::post};
    use axum_extra::extract::cookie::Key;
    use axum_test::TestServer;
    use rusqlite::Connection;
    use sha2::{Digest, Sha512};
    use time::Duration;

    use crate::{
        auth::{UserID, cookie::COOKIE_TOKEN, user::get_user_by_email},
        endpoints,
        session::SessionHub,
        store::initialize,
    };

    use super::{RegisterForm, RegisterState, register_user, validate_form};

    const STRONG_PASSWORD: &str = "kV2#plinth-otter!94quasar";

    fn get_test_state() -> RegisterState {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        let hash = Sha512::digest("nafstenoas");
        RegisterState {
            cookie_key: Key::from(&hash),
            cookie_duration: Duration::minutes(5),
            sessions: SessionHub::new(),
            db_connection: Arc::new(Mutex::new(conn)),
        }
    }

    fn get_test_server(state: RegisterState) -> TestServer {
        let app = Router::new()
            .route(endpoints::USERS, post(register_user))
            .with_state(state);

        TestServer::try_new(app).expect("Could not create test server.")
    }

    fn form(password: &str, confirm_password: &str) -> [(&'static str, String); 4] {
        [
            ("display_name", "Ferris".to_owned()),
            ("email", "foo@bar.baz".to_owned()),
            ("password", password.to_owned()),
            ("confirm_password", confirm_password.to_owned()),
        ]
    }

    #[tokio::test]
    async fn register_creates_user_and_signs_them_in() {
        let state = get_test_state();
        let server = get_test_server(state.clone());

        let response = server
            .post(endpoints::USERS)
            .form(&form(STRONG_PASSWORD, STRONG_PASSWORD))
            .await;

        response.assert_status_see_other();
        assert_eq!(response.header("hx-redirect"), endpoints::DASHBOARD_VIEW);
        assert!(response.maybe_cookie(COOKIE_TOKEN).is_some());

        let connection = state.db_connection.lock().unwrap();
        let user = get_user_by_email("foo@bar.baz", &connection).unwrap().unwrap();
        assert_eq!(user.display_name, "Ferris");
        assert!(state.sessions.current(user.id).is_some());
    }

    #[tokio::test]
    async fn mismatched_passwords_are_rejected() {
        let server = get_test_server(get_test_state());

        let response = server
            .post(endpoints::USERS)
            .form(&form(STRONG_PASSWORD, "somethingelseentirely"))
            .await;

        response.assert_status(axum::http::StatusCode::UNPROCESSABLE_ENTITY);
        assert!(response.text().contains("do not match"));
    }

    #[tokio::test]
    async fn weak_passwords_are_rejected() {
        let server = get_test_server(get_test_state());

        let response = server
            .post(endpoints::USERS)
            .form(&form("hunter2hunter2", "hunter2hunter2"))
            .await;

        response.assert_status(axum::http::StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let state = get_test_state();
        let server = get_test_server(state.clone());
        server
            .post(endpoints::USERS)
            .form(&form(STRONG_PASSWORD, STRONG_PASSWORD))
            .await
            .assert_status_see_other();
        state.sessions.sign_out(UserID::new(1));

        let response = server
            .post(endpoints::USERS)
            .form(&form(STRONG_PASSWORD, STRONG_PASSWORD))
            .await;

        response.assert_status(axum::http::StatusCode::CONFLICT);
        assert!(response.text().contains("already registered"));
    }

    #[test]
    fn validate_rejects_implausible_emails() {
        let make_form = |email: &str| RegisterForm {
            display_name: "Ferris".to_owned(),
            email: email.to_owned(),
            password: STRONG_PASSWORD.to_owned(),
            confirm_password: STRONG_PASSWORD.to_owned(),
        };

        assert!(validate_form(&make_form("foo@bar.baz")).is_ok());
        assert!(validate_form(&make_form("foobar.baz")).is_err());
        assert!(validate_form(&make_form("@bar.baz")).is_err());
        assert!(validate_form(&make_form("foo@no-dot")).is_err());
    }
}
