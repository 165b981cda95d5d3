//! The endpoint for signing out.

use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::PrivateCookieJar;

use crate::{
    auth::{
        cookie::{get_token_from_cookies, invalidate_auth_cookie},
        middleware::AuthState,
    },
    endpoints,
};

/// Destroy the current session and clear the auth cookie, then redirect to
/// the sign-in page.
///
/// Signing out also tears down the user's live feed (via the session hub), so
/// no stale mirror outlives the session.
pub async fn get_log_out(State(state): State<AuthState>, jar: PrivateCookieJar) -> Response {
    if let Ok(token) = get_token_from_cookies(&jar) {
        state.sessions.sign_out(token.user_id);
    }

    let jar = invalidate_auth_cookie(jar);

    (jar, Redirect::to(endpoints::LOG_IN_VIEW)).into_response()
}
