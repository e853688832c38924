pub mod password;
pub mod sessions;
pub mod sign_in;
pub mod two_factor;

use axum::http::HeaderMap;

use crate::domain::types::Session;
use crate::error::AuthServiceError;
use crate::state::AppState;
use crate::usecase::session::AuthenticateSessionUseCase;
use crate::usecase::signin::ClientMeta;

/// Resolve the presented token to a live session, or 401.
pub(crate) async fn require_session(
    state: &AppState,
    token: &str,
) -> Result<Session, AuthServiceError> {
    let usecase = AuthenticateSessionUseCase {
        sessions: state.session_repo(),
    };
    usecase.execute(token).await
}

/// Client metadata recorded on new sessions. The service sits behind a
/// reverse proxy, so the client address comes from `x-forwarded-for`.
pub(crate) fn client_meta(headers: &HeaderMap) -> ClientMeta {
    let ip_address = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty());
    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_owned());
    ClientMeta {
        ip_address,
        user_agent,
    }
}
