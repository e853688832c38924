use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::CookieJar;
use chrono::{DateTime, Utc};
use serde::Serialize;

use vantra_auth_types::cookie::clear_session_cookie;
use vantra_auth_types::extract::SessionToken;

use crate::error::AuthServiceError;
use crate::handlers::require_session;
use crate::state::AppState;
use crate::usecase::session::{
    ListSessionsUseCase, RevokeAllSessionsUseCase, RevokeOtherSessionsUseCase,
    RevokeSessionUseCase,
};

#[derive(Serialize)]
pub struct SessionView {
    pub token: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    /// True for the session making this request.
    pub current: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

// ── GET /auth/sessions ────────────────────────────────────────────────────────

pub async fn list_sessions(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
) -> Result<impl IntoResponse, AuthServiceError> {
    let current = require_session(&state, &token).await?;

    let usecase = ListSessionsUseCase {
        sessions: state.session_repo(),
    };
    let sessions = usecase.execute(current.user_id).await?;

    let views: Vec<SessionView> = sessions
        .into_iter()
        .map(|s| SessionView {
            current: s.token == current.token,
            token: s.token,
            ip_address: s.ip_address,
            user_agent: s.user_agent,
            created_at: s.created_at,
            expires_at: s.expires_at,
        })
        .collect();
    Ok(Json(views))
}

// ── DELETE /auth/sessions/{token} ─────────────────────────────────────────────

pub async fn revoke_session(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
    Path(target_token): Path<String>,
) -> Result<StatusCode, AuthServiceError> {
    let current = require_session(&state, &token).await?;

    let usecase = RevokeSessionUseCase {
        sessions: state.session_repo(),
    };
    usecase.execute(current.user_id, &target_token).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── DELETE /auth/sessions/others ──────────────────────────────────────────────

pub async fn revoke_other_sessions(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
) -> Result<StatusCode, AuthServiceError> {
    let current = require_session(&state, &token).await?;

    let usecase = RevokeOtherSessionsUseCase {
        sessions: state.session_repo(),
    };
    usecase.execute(current.user_id, &current.token).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── DELETE /auth/sessions ─────────────────────────────────────────────────────

pub async fn revoke_all_sessions(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
    jar: CookieJar,
) -> Result<impl IntoResponse, AuthServiceError> {
    let current = require_session(&state, &token).await?;

    let usecase = RevokeAllSessionsUseCase {
        sessions: state.session_repo(),
    };
    usecase.execute(current.user_id).await?;

    // The caller's own session is gone too; drop the cookie with it.
    let jar = clear_session_cookie(jar, state.cookie_domain.clone());
    Ok((StatusCode::NO_CONTENT, jar))
}
