//! Session cookie builders shared with the web-app layer.
//!
//! The session token is opaque; the cookie only carries it. Lifetime matches
//! the server-side session expiry so the browser drops the cookie around the
//! same time the session row goes inert.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

/// Cookie name for the session token.
pub const VANTRA_SESSION: &str = "vantra_session";

/// Cookie Max-Age in seconds (30 days, same as session expiry).
pub const SESSION_COOKIE_MAX_AGE: u64 = 2_592_000;

/// Set the session cookie on the jar.
///
/// ```
/// use axum_extra::extract::cookie::CookieJar;
/// use vantra_auth_types::cookie::{set_session_cookie, VANTRA_SESSION};
///
/// let jar = CookieJar::new();
/// let jar = set_session_cookie(jar, "token_value".to_string(), "example.com".to_string());
/// let cookie = jar.get(VANTRA_SESSION).unwrap();
/// assert_eq!(cookie.path(), Some("/"));
/// assert_eq!(cookie.domain(), Some("example.com"));
/// assert_eq!(cookie.max_age(), Some(time::Duration::seconds(2_592_000)));
/// assert!(cookie.http_only().unwrap_or(false));
/// assert!(cookie.secure().unwrap_or(false));
/// ```
pub fn set_session_cookie(jar: CookieJar, value: String, domain: String) -> CookieJar {
    let cookie = Cookie::build((VANTRA_SESSION, value))
        .path("/")
        .domain(domain)
        .max_age(Duration::seconds(SESSION_COOKIE_MAX_AGE as i64))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .build();
    jar.add(cookie)
}

/// Clear the session cookie by setting Max-Age to 0.
///
/// ```
/// use axum_extra::extract::cookie::CookieJar;
/// use vantra_auth_types::cookie::{clear_session_cookie, set_session_cookie, VANTRA_SESSION};
///
/// let jar = CookieJar::new();
/// let jar = set_session_cookie(jar, "t".to_string(), "example.com".to_string());
/// let jar = clear_session_cookie(jar, "example.com".to_string());
/// let cookie = jar.get(VANTRA_SESSION).unwrap();
/// assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
/// ```
pub fn clear_session_cookie(jar: CookieJar, domain: String) -> CookieJar {
    let cookie = Cookie::build((VANTRA_SESSION, ""))
        .path("/")
        .domain(domain)
        .max_age(Duration::ZERO)
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .build();
    jar.add(cookie)
}
