//! Reading and writing the private auth cookie.

use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, SameSite},
};
use time::{Duration, OffsetDateTime};

use crate::{AuthError, auth::UserID, auth::token::Token};

pub const COOKIE_TOKEN: &str = "session_token";

/// How long a session lasts before the user has to sign in again.
pub const DEFAULT_COOKIE_DURATION: Duration = Duration::days(7);

/// Add an auth cookie to the cookie jar, signing in `user_id` for
/// `duration` from now.
///
/// Returns the cookie jar with the cookie added.
///
/// # Errors
/// Returns an [AuthError::InvalidToken] if the token cannot be serialized.
pub fn set_auth_cookie(
    jar: PrivateCookieJar,
    user_id: UserID,
    duration: Duration,
) -> Result<PrivateCookieJar, AuthError> {
    let expires_at = OffsetDateTime::now_utc() + duration;
    let token = Token {
        user_id,
        expires_at,
    };
    let token_string = serde_json::to_string(&token).map_err(|error| {
        tracing::error!("could not serialize auth token: {error}");
        AuthError::InvalidToken
    })?;

    Ok(jar.add(
        Cookie::build((COOKIE_TOKEN, token_string))
            .expires(expires_at)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true),
    ))
}

/// Set the auth cookie to an invalid value and set its max age to zero, which
/// should delete the cookie on the client side.
pub fn invalidate_auth_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.add(
        Cookie::build((COOKIE_TOKEN, "deleted"))
            .expires(OffsetDateTime::UNIX_EPOCH)
            .max_age(Duration::ZERO)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true),
    )
}

/// Parse the auth token out of the cookie jar.
///
/// # Errors
/// Returns a:
/// - [AuthError::CookieMissing] if there is no auth cookie,
/// - [AuthError::InvalidToken] if the cookie contents do not parse.
pub fn get_token_from_cookies(jar: &PrivateCookieJar) -> Result<Token, AuthError> {
    let cookie = jar.get(COOKIE_TOKEN).ok_or(AuthError::CookieMissing)?;

    serde_json::from_str(cookie.value_trimmed()).map_err(|_| AuthError::InvalidToken)
}

#[cfg(test)]
mod cookie_tests {
    use axum_extra::extract::{PrivateCookieJar, cookie::Key};
    use sha2::{Digest, Sha512};
    use time::{Duration, OffsetDateTime};

    use crate::{AuthError, auth::UserID};

    use super::{
        DEFAULT_COOKIE_DURATION, get_token_from_cookies, invalidate_auth_cookie, set_auth_cookie,
    };

    fn get_jar() -> PrivateCookieJar {
        let hash = Sha512::digest(b"foobar");
        let key = Key::from(&hash);

        PrivateCookieJar::new(key)
    }

    #[test]
    fn set_then_get_round_trips() {
        let user_id = UserID::new(1);

        let jar = set_auth_cookie(get_jar(), user_id, DEFAULT_COOKIE_DURATION).unwrap();
        let token = get_token_from_cookies(&jar).unwrap();

        assert_eq!(token.user_id, user_id);
        assert!(!token.has_expired(OffsetDateTime::now_utc()));
        assert!(token.has_expired(OffsetDateTime::now_utc() + Duration::days(8)));
    }

    #[test]
    fn get_fails_on_empty_jar() {
        let result = get_token_from_cookies(&get_jar());

        assert_eq!(result, Err(AuthError::CookieMissing));
    }

    #[test]
    fn invalidated_cookie_no_longer_parses() {
        let jar = set_auth_cookie(get_jar(), UserID::new(1), DEFAULT_COOKIE_DURATION).unwrap();

        let jar = invalidate_auth_cookie(jar);

        assert_eq!(get_token_from_cookies(&jar), Err(AuthError::InvalidToken));
    }
}
