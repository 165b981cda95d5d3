//! Google sign-in via the OAuth 2.0 authorization-code flow with PKCE.
//!
//! The sign-in button redirects the browser to Google's consent page; Google
//! redirects back to the callback endpoint with a one-time code, which is
//! exchanged for an access token and used to fetch the user's profile. The
//! account is then created or refreshed from that profile and the regular
//! cookie session is established. Google-created accounts have no password
//! hash.

use std::{
    collections::HashMap,
    env,
    sync::{Arc, Mutex},
};

use axum::{
    extract::{FromRef, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, Scope, TokenResponse, TokenUrl,
    basic::BasicClient,
};
use rusqlite::Connection;
use serde::Deserialize;
use time::Duration;
use url::Url;

use crate::{
    AppState, AuthError,
    auth::{cookie::set_auth_cookie, user::upsert_oauth_user},
    endpoints,
    session::SessionHub,
};

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

type ConfiguredClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// The Google OAuth configuration plus the in-flight sign-in attempts.
#[derive(Clone)]
pub struct GoogleOAuth {
    client_id: String,
    client_secret: String,
    redirect_url: String,
    // PKCE verifiers keyed by the CSRF state of the attempt they belong to.
    pending: Arc<Mutex<HashMap<String, String>>>,
}

impl GoogleOAuth {
    /// Build the configuration from `GOOGLE_CLIENT_ID` and
    /// `GOOGLE_CLIENT_SECRET`, or `None` when either is unset, in which case
    /// the sign-in page simply does not offer Google.
    ///
    /// `public_url` is the origin browsers reach the app at, e.g.
    /// `https://localhost:3000`.
    pub fn from_env(public_url: &str) -> Option<Self> {
        let client_id = env::var("GOOGLE_CLIENT_ID").ok()?;
        let client_secret = env::var("GOOGLE_CLIENT_SECRET").ok()?;

        Some(Self {
            client_id,
            client_secret,
            redirect_url: format!(
                "{}{}",
                public_url.trim_end_matches('/'),
                endpoints::OAUTH_GOOGLE_CALLBACK
            ),
            pending: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        Self {
            client_id: "test-client-id".to_owned(),
            client_secret: "test-client-secret".to_owned(),
            redirect_url: "https://localhost:3000/auth/google/callback".to_owned(),
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn client(&self) -> Result<ConfiguredClient, AuthError> {
        let auth_url = AuthUrl::new(GOOGLE_AUTH_URL.to_owned())
            .map_err(|error| AuthError::OAuthFailed(format!("invalid auth URL: {error}")))?;
        let token_url = TokenUrl::new(GOOGLE_TOKEN_URL.to_owned())
            .map_err(|error| AuthError::OAuthFailed(format!("invalid token URL: {error}")))?;
        let redirect_url = RedirectUrl::new(self.redirect_url.clone())
            .map_err(|error| AuthError::OAuthFailed(format!("invalid redirect URL: {error}")))?;

        Ok(BasicClient::new(ClientId::new(self.client_id.clone()))
            .set_client_secret(ClientSecret::new(self.client_secret.clone()))
            .set_auth_uri(auth_url)
            .set_token_uri(token_url)
            .set_redirect_uri(redirect_url))
    }

    /// Build the consent-page URL for a fresh sign-in attempt and remember
    /// its PKCE verifier until the callback arrives.
    ///
    /// # Errors
    /// Returns an [AuthError::OAuthFailed] if the configured URLs are
    /// invalid.
    pub fn authorization_url(&self) -> Result<Url, AuthError> {
        let client = self.client()?;
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let (url, csrf_token) = client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new("openid".to_owned()))
            .add_scope(Scope::new("email".to_owned()))
            .add_scope(Scope::new("profile".to_owned()))
            .set_pkce_challenge(pkce_challenge)
            .url();

        self.pending
            .lock()
            .expect("pending sign-in map poisoned")
            .insert(
                csrf_token.secret().clone(),
                pkce_verifier.secret().clone(),
            );

        Ok(url)
    }

    /// Exchange the callback's code for the user's Google profile.
    ///
    /// # Errors
    /// Returns an [AuthError::OAuthFailed] if the CSRF state is unknown, the
    /// token exchange fails, or the profile cannot be fetched.
    pub async fn exchange(&self, code: String, csrf_state: &str) -> Result<GoogleProfile, AuthError> {
        let verifier = self
            .pending
            .lock()
            .expect("pending sign-in map poisoned")
            .remove(csrf_state)
            .ok_or_else(|| AuthError::OAuthFailed("unknown or replayed state".to_owned()))?;

        let client = self.client()?;
        let http_client = reqwest::ClientBuilder::new()
            // Following redirects opens the client up to SSRF vulnerabilities.
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|error| AuthError::OAuthFailed(format!("HTTP client: {error}")))?;

        let token = client
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(PkceCodeVerifier::new(verifier))
            .request_async(&http_client)
            .await
            .map_err(|error| AuthError::OAuthFailed(format!("token exchange: {error}")))?;

        let profile = http_client
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(token.access_token().secret())
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|error| AuthError::OAuthFailed(format!("userinfo request: {error}")))?
            .json::<GoogleProfile>()
            .await
            .map_err(|error| AuthError::OAuthFailed(format!("userinfo parse: {error}")))?;

        Ok(profile)
    }
}

/// The subset of Google's userinfo response the app cares about.
#[derive(Debug, Deserialize)]
pub struct GoogleProfile {
    /// The account's email address.
    pub email: String,
    /// The account's display name.
    pub name: Option<String>,
    /// The account's profile picture URL.
    pub picture: Option<String>,
}

/// The state needed for the OAuth endpoints.
#[derive(Clone)]
pub struct OAuthState {
    /// The Google configuration, if any.
    pub oauth: Option<GoogleOAuth>,
    /// The active sessions.
    pub sessions: SessionHub,
    /// The database connection for upserting users.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
}

impl FromRef<AppState> for OAuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            oauth: state.oauth.clone(),
            sessions: state.sessions.clone(),
            db_connection: Arc::clone(state.store.connection()),
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<OAuthState> for Key {
    fn from_ref(state: &OAuthState) -> Self {
        state.cookie_key.clone()
    }
}

/// Kick off a Google sign-in by redirecting to the consent page.
pub async fn get_google_sign_in(State(state): State<OAuthState>) -> Response {
    let Some(oauth) = &state.oauth else {
        return Redirect::to(endpoints::LOG_IN_VIEW).into_response();
    };

    match oauth.authorization_url() {
        Ok(url) => Redirect::to(url.as_str()).into_response(),
        Err(error) => {
            tracing::error!("could not build Google authorization URL: {error}");
            Redirect::to(OAUTH_FAILED_REDIRECT).into_response()
        }
    }
}

/// Where failed OAuth attempts land: the sign-in page with an inline alert.
const OAUTH_FAILED_REDIRECT: &str = "/log_in?error=oauth";

/// The query parameters Google sends to the callback endpoint.
#[derive(Debug, Deserialize)]
pub struct OAuthCallbackQuery {
    /// The one-time authorization code. Absent when the user cancelled.
    pub code: Option<String>,
    /// The CSRF state issued when the flow started.
    pub state: Option<String>,
    /// Google's error code, e.g. "access_denied".
    pub error: Option<String>,
}

/// Complete a Google sign-in: exchange the code, upsert the account, create
/// the session, and set the auth cookie.
pub async fn get_google_callback(
    State(state): State<OAuthState>,
    Query(query): Query<OAuthCallbackQuery>,
    jar: PrivateCookieJar,
) -> Response {
    let Some(oauth) = &state.oauth else {
        return Redirect::to(endpoints::LOG_IN_VIEW).into_response();
    };

    if let Some(error) = &query.error {
        tracing::warn!("Google sign-in was not completed: {error}");
        return Redirect::to(OAUTH_FAILED_REDIRECT).into_response();
    }

    let (Some(code), Some(csrf_state)) = (query.code, query.state) else {
        tracing::warn!("Google callback is missing the code or state parameter");
        return Redirect::to(OAUTH_FAILED_REDIRECT).into_response();
    };

    let profile = match oauth.exchange(code, &csrf_state).await {
        Ok(profile) => profile,
        Err(error) => {
            tracing::error!("Google sign-in failed: {error}");
            return Redirect::to(OAUTH_FAILED_REDIRECT).into_response();
        }
    };

    let user = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(_) => {
                tracing::error!("could not acquire the database lock for OAuth sign-in");
                return Redirect::to(OAUTH_FAILED_REDIRECT).into_response();
            }
        };

        let display_name = profile
            .name
            .clone()
            .unwrap_or_else(|| profile.email.clone());

        upsert_oauth_user(
            &profile.email,
            &display_name,
            profile.picture.as_deref(),
            &connection,
        )
    };

    match user {
        Ok(user) => {
            state.sessions.sign_in(user.session());

            match set_auth_cookie(jar, user.id, state.cookie_duration) {
                Ok(jar) => (jar, Redirect::to(endpoints::DASHBOARD_VIEW)).into_response(),
                Err(error) => {
                    tracing::error!("could not set auth cookie after OAuth sign-in: {error}");
                    Redirect::to(OAUTH_FAILED_REDIRECT).into_response()
                }
            }
        }
        Err(error) => {
            tracing::error!("could not upsert OAuth user: {error}");
            Redirect::to(OAUTH_FAILED_REDIRECT).into_response()
        }
    }
}
