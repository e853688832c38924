//! Session token request extractor.

use axum::extract::FromRequestParts;
use axum_extra::extract::CookieJar;
use http::StatusCode;
use http::request::Parts;

use crate::cookie::VANTRA_SESSION;

/// The opaque session token presented by the caller, taken from the
/// `vantra_session` cookie or, failing that, an `Authorization: Bearer`
/// header (API clients).
///
/// Extraction only proves a token was *presented*; handlers must still
/// resolve it against the session store. Returns 401 when neither carrier
/// is present.
#[derive(Debug, Clone)]
pub struct SessionToken(pub String);

fn bearer_token(parts: &Parts) -> Option<String> {
    let value = parts.headers.get(http::header::AUTHORIZATION)?;
    let value = value.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_owned())
    }
}

impl<S> FromRequestParts<S> for SessionToken
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    // axum-core 0.5 defines this as `fn -> impl Future + Send` (not `async fn`),
    // so extract synchronously and return a 'static async block.
    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let from_cookie = CookieJar::from_headers(&parts.headers)
            .get(VANTRA_SESSION)
            .map(|c| c.value().to_owned())
            .filter(|v| !v.is_empty());
        let token = from_cookie.or_else(|| bearer_token(parts));

        async move {
            let token = token.ok_or(StatusCode::UNAUTHORIZED)?;
            Ok(Self(token))
        }
    }
}
