//! Authentication middleware: the session gate in front of every protected
//! route.
//!
//! Each request gets a fresh [SessionGate]. The cookie plus the session hub
//! are the request's session-state resolution: both must agree before any
//! protected content is rendered, so signing out elsewhere (which clears the
//! hub) immediately locks out stale cookies. Route handlers behind the guard
//! can use `Extension(session): Extension<Session>` (or `Extension<UserID>`)
//! to receive the signed-in user.

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use time::{Duration, OffsetDateTime};

use crate::{
    AppState, endpoints,
    auth::cookie::get_token_from_cookies,
    session::{GateEffect, Session, SessionGate, SessionHub},
};

/// The state needed for the auth middleware.
#[derive(Clone)]
pub struct AuthState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    /// The active sessions.
    pub sessions: SessionHub,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            sessions: state.sessions.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AuthState> for Key {
    fn from_ref(state: &AuthState) -> Self {
        state.cookie_key.clone()
    }
}

/// Resolve the request's session: a parseable, unexpired token whose user is
/// still signed in according to the hub.
fn resolve_session(state: &AuthState, jar: &PrivateCookieJar) -> Option<Session> {
    let token = get_token_from_cookies(jar).ok()?;

    if token.has_expired(OffsetDateTime::now_utc()) {
        return None;
    }

    state.sessions.current(token.user_id)
}

#[inline]
async fn auth_guard_internal(
    state: AuthState,
    request: Request,
    next: Next,
    get_redirect: impl Fn(&str) -> Response,
) -> Response {
    let (mut parts, body) = request.into_parts();
    let jar = match PrivateCookieJar::from_request_parts(&mut parts, &state).await {
        Ok(jar) => jar,
        Err(err) => {
            tracing::error!("Error getting cookie jar: {err:?}. Redirecting to log in page.");
            return get_redirect(endpoints::LOG_IN_VIEW);
        }
    };

    let session = resolve_session(&state, &jar);

    let mut gate = SessionGate::new();
    match gate.observe(session.as_ref()) {
        GateEffect::RenderProtected => {
            let session = session.expect("the gate only renders protected content with a session");
            parts.extensions.insert(session.user_id);
            parts.extensions.insert(session);

            next.run(Request::from_parts(parts, body)).await
        }
        GateEffect::Redirect | GateEffect::AlreadyRedirected => {
            get_redirect(endpoints::LOG_IN_VIEW)
        }
    }
}

/// Middleware that blocks unauthenticated requests to page routes.
///
/// Requests without a valid session are answered with a redirect to the
/// sign-in page.
pub async fn auth_guard(State(state): State<AuthState>, request: Request, next: Next) -> Response {
    auth_guard_internal(state, request, next, |redirect_url| {
        Redirect::to(redirect_url).into_response()
    })
    .await
}

/// Middleware that blocks unauthenticated requests to API routes called by
/// HTMX.
///
/// Uses the HX-Redirect header so the redirect navigates the whole page
/// instead of swapping the fragment.
pub async fn auth_guard_hx(
    State(state): State<AuthState>,
    request: Request,
    next: Next,
) -> Response {
    auth_guard_internal(state, request, next, |redirect_url| {
        (HxRedirect(redirect_url.to_owned()), StatusCode::OK).into_response()
    })
    .await
}

#[cfg(test)]
mod auth_guard_tests {
    use axum::{
        Router,
        extract::State,
        middleware,
        response::Html,
        routing::{get, post},
    };
    use axum_extra::extract::{PrivateCookieJar, cookie::Cookie, cookie::Key};
    use axum_test::TestServer;
    use sha2::{Digest, Sha512};
    use time::Duration;

    use crate::{
        AuthError,
        auth::{
            UserID,
            cookie::{COOKIE_TOKEN, set_auth_cookie},
        },
        endpoints,
        session::{Session, SessionHub},
    };

    use super::{AuthState, auth_guard, auth_guard_hx};

    const TEST_LOG_IN_ROUTE: &str = "/stub_log_in";
    const TEST_PROTECTED_ROUTE: &str = "/protected";
    const TEST_API_ROUTE: &str = "/api/protected";

    async fn test_handler() -> Html<&'static str> {
        Html("<h1>Hello, World!</h1>")
    }

    /// Signs in user 1 the way the log-in endpoint does: hub entry + cookie.
    async fn stub_log_in_route(
        State(state): State<AuthState>,
        jar: PrivateCookieJar,
    ) -> Result<PrivateCookieJar, AuthError> {
        state.sessions.sign_in(Session {
            user_id: UserID::new(1),
            display_name: "Ferris".to_owned(),
            photo_url: None,
        });

        set_auth_cookie(jar, UserID::new(1), state.cookie_duration)
    }

    fn get_test_state(cookie_duration: Duration) -> AuthState {
        let hash = Sha512::digest("nafstenoas");

        AuthState {
            cookie_key: Key::from(&hash),
            cookie_duration,
            sessions: SessionHub::new(),
        }
    }

    fn get_test_server(state: AuthState) -> TestServer {
        let page_routes = Router::new()
            .route(TEST_PROTECTED_ROUTE, get(test_handler))
            .layer(middleware::from_fn_with_state(state.clone(), auth_guard));
        let api_routes = Router::new()
            .route(TEST_API_ROUTE, get(test_handler))
            .layer(middleware::from_fn_with_state(state.clone(), auth_guard_hx));

        let app = page_routes
            .merge(api_routes)
            .route(TEST_LOG_IN_ROUTE, post(stub_log_in_route))
            .with_state(state);

        TestServer::try_new(app).expect("Could not create test server.")
    }

    #[tokio::test]
    async fn get_protected_route_with_valid_session() {
        let server = get_test_server(get_test_state(Duration::minutes(5)));
        let response = server.post(TEST_LOG_IN_ROUTE).await;
        response.assert_status_ok();
        let token_cookie = response.cookie(COOKIE_TOKEN);

        server
            .get(TEST_PROTECTED_ROUTE)
            .add_cookie(token_cookie)
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn get_protected_route_with_no_cookie_redirects_to_log_in() {
        let server = get_test_server(get_test_state(Duration::minutes(5)));

        let response = server.get(TEST_PROTECTED_ROUTE).await;

        response.assert_status_see_other();
        assert_eq!(response.header("location"), endpoints::LOG_IN_VIEW);
    }

    #[tokio::test]
    async fn get_protected_route_with_garbage_cookie_redirects_to_log_in() {
        let server = get_test_server(get_test_state(Duration::minutes(5)));

        let response = server
            .get(TEST_PROTECTED_ROUTE)
            .add_cookie(Cookie::build((COOKIE_TOKEN, "FOOBAR")).build())
            .await;

        response.assert_status_see_other();
        assert_eq!(response.header("location"), endpoints::LOG_IN_VIEW);
    }

    #[tokio::test]
    async fn get_protected_route_with_expired_token_redirects_to_log_in() {
        // The token inside the cookie expires immediately.
        let server = get_test_server(get_test_state(Duration::seconds(-1)));
        let response = server.post(TEST_LOG_IN_ROUTE).await;
        response.assert_status_ok();
        let token_cookie = response.cookie(COOKIE_TOKEN);

        let response = server
            .get(TEST_PROTECTED_ROUTE)
            .add_cookie(token_cookie)
            .await;

        response.assert_status_see_other();
        assert_eq!(response.header("location"), endpoints::LOG_IN_VIEW);
    }

    #[tokio::test]
    async fn sign_out_elsewhere_locks_out_a_stale_cookie() {
        let state = get_test_state(Duration::minutes(5));
        let server = get_test_server(state.clone());
        let response = server.post(TEST_LOG_IN_ROUTE).await;
        response.assert_status_ok();
        let token_cookie = response.cookie(COOKIE_TOKEN);

        state.sessions.sign_out(UserID::new(1));

        let response = server
            .get(TEST_PROTECTED_ROUTE)
            .add_cookie(token_cookie)
            .await;

        response.assert_status_see_other();
        assert_eq!(response.header("location"), endpoints::LOG_IN_VIEW);
    }

    #[tokio::test]
    async fn api_route_redirects_via_hx_header() {
        let server = get_test_server(get_test_state(Duration::minutes(5)));

        let response = server.get(TEST_API_ROUTE).await;

        response.assert_status_ok();
        assert_eq!(response.header("hx-redirect"), endpoints::LOG_IN_VIEW);
    }
}
