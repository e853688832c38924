use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;

use vantra_auth_types::extract::SessionToken;

use crate::error::AuthServiceError;
use crate::handlers::require_session;
use crate::state::AppState;
use crate::usecase::password::{
    ChangePasswordInput, ChangePasswordUseCase, RequestPasswordResetUseCase, ResetPasswordUseCase,
};

// ── PATCH /auth/password ──────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

pub async fn change_password(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<StatusCode, AuthServiceError> {
    let current = require_session(&state, &token).await?;

    let usecase = ChangePasswordUseCase {
        credentials: state.credential_repo(),
        sessions: state.session_repo(),
        revoke_other_sessions: state.revoke_other_sessions_on_password_change,
    };
    usecase
        .execute(ChangePasswordInput {
            user_id: current.user_id,
            current_token: current.token,
            current_password: body.current_password,
            new_password: body.new_password,
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── POST /auth/password/reset ─────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct RequestPasswordResetRequest {
    pub email: String,
}

pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(body): Json<RequestPasswordResetRequest>,
) -> Result<StatusCode, AuthServiceError> {
    let usecase = RequestPasswordResetUseCase {
        credentials: state.credential_repo(),
        reset_tokens: state.reset_token_repo(),
    };
    usecase.execute(&body.email).await?;
    // Always 202: whether the email exists is not disclosed.
    Ok(StatusCode::ACCEPTED)
}

// ── PATCH /auth/password/reset ────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(body): Json<ResetPasswordRequest>,
) -> Result<StatusCode, AuthServiceError> {
    let usecase = ResetPasswordUseCase {
        credentials: state.credential_repo(),
        sessions: state.session_repo(),
        reset_tokens: state.reset_token_repo(),
    };
    usecase.execute(&body.token, &body.new_password).await?;
    Ok(StatusCode::NO_CONTENT)
}
