use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};

use vantra_auth_types::extract::SessionToken;

use crate::error::AuthServiceError;
use crate::handlers::require_session;
use crate::state::AppState;
use crate::usecase::enrollment::{
    CompleteEnrollmentUseCase, ConfirmEnrollmentUseCase, DisableTwoFactorUseCase,
    EnableTwoFactorUseCase, ResetEnrollmentUseCase, TwoFactorStatusUseCase,
};

// ── GET /auth/two-factor ──────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct TwoFactorStatusResponse {
    pub enabled: bool,
    pub step: &'static str,
}

pub async fn two_factor_status(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
) -> Result<impl IntoResponse, AuthServiceError> {
    let current = require_session(&state, &token).await?;

    let usecase = TwoFactorStatusUseCase {
        credentials: state.credential_repo(),
        cache: state.two_factor_cache(),
    };
    let status = usecase.execute(current.user_id).await?;
    Ok(Json(TwoFactorStatusResponse {
        enabled: status.enabled,
        step: status.step.as_str(),
    }))
}

// ── POST /auth/two-factor/enrollment ──────────────────────────────────────────

#[derive(Deserialize)]
pub struct EnableTwoFactorRequest {
    pub password: String,
}

#[derive(Serialize)]
pub struct EnableTwoFactorResponse {
    pub secret: String,
    pub otpauth_uri: String,
    /// Shown exactly once; stored only as hashes from here on.
    pub backup_codes: Vec<String>,
}

pub async fn enable_two_factor(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
    Json(body): Json<EnableTwoFactorRequest>,
) -> Result<impl IntoResponse, AuthServiceError> {
    let current = require_session(&state, &token).await?;

    let usecase = EnableTwoFactorUseCase {
        credentials: state.credential_repo(),
        backup_codes: state.backup_code_repo(),
        cache: state.two_factor_cache(),
        cipher: state.cipher.clone(),
        issuer: state.totp_issuer.clone(),
    };
    let output = usecase.execute(current.user_id, &body.password).await?;

    Ok((
        StatusCode::CREATED,
        Json(EnableTwoFactorResponse {
            secret: output.secret_base32,
            otpauth_uri: output.otpauth_uri,
            backup_codes: output.backup_codes,
        }),
    ))
}

// ── PATCH /auth/two-factor/enrollment ─────────────────────────────────────────

#[derive(Deserialize)]
pub struct ConfirmTwoFactorRequest {
    pub code: String,
}

pub async fn confirm_two_factor(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
    Json(body): Json<ConfirmTwoFactorRequest>,
) -> Result<StatusCode, AuthServiceError> {
    let current = require_session(&state, &token).await?;

    let usecase = ConfirmEnrollmentUseCase {
        credentials: state.credential_repo(),
        cache: state.two_factor_cache(),
        cipher: state.cipher.clone(),
    };
    usecase.execute(current.user_id, &body.code).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── DELETE /auth/two-factor/enrollment ────────────────────────────────────────

pub async fn reset_enrollment(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
) -> Result<StatusCode, AuthServiceError> {
    let current = require_session(&state, &token).await?;

    let usecase = ResetEnrollmentUseCase {
        credentials: state.credential_repo(),
        backup_codes: state.backup_code_repo(),
        cache: state.two_factor_cache(),
    };
    usecase.execute(current.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── POST /auth/two-factor ─────────────────────────────────────────────────────

pub async fn complete_two_factor(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
) -> Result<StatusCode, AuthServiceError> {
    let current = require_session(&state, &token).await?;

    let usecase = CompleteEnrollmentUseCase {
        credentials: state.credential_repo(),
        cache: state.two_factor_cache(),
    };
    usecase.execute(current.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── DELETE /auth/two-factor ───────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct DisableTwoFactorRequest {
    pub password: String,
}

pub async fn disable_two_factor(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
    Json(body): Json<DisableTwoFactorRequest>,
) -> Result<StatusCode, AuthServiceError> {
    let current = require_session(&state, &token).await?;

    let usecase = DisableTwoFactorUseCase {
        credentials: state.credential_repo(),
        backup_codes: state.backup_code_repo(),
        cache: state.two_factor_cache(),
    };
    usecase.execute(current.user_id, &body.password).await?;
    Ok(StatusCode::NO_CONTENT)
}
