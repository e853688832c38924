use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vantra_auth_types::cookie::set_session_cookie;

use crate::domain::types::Session;
use crate::error::AuthServiceError;
use crate::handlers::client_meta;
use crate::state::AppState;
use crate::usecase::signin::{
    SignInInput, SignInOutcome, SignInUseCase, VerifyTwoFactorInput, VerifyTwoFactorUseCase,
};

#[derive(Serialize)]
pub struct SessionResponse {
    pub user_id: uuid::Uuid,
    /// Returned in the body for bearer-style clients; browsers use the cookie.
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<&Session> for SessionResponse {
    fn from(session: &Session) -> Self {
        Self {
            user_id: session.user_id,
            token: session.token.clone(),
            created_at: session.created_at,
            expires_at: session.expires_at,
        }
    }
}

#[derive(Serialize)]
pub struct PendingTwoFactorResponse {
    pub pending_two_factor: bool,
    /// Resubmitted with the code; single-use, 5-minute TTL.
    pub ticket: String,
}

// ── POST /auth/sign-in ────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

pub async fn sign_in(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(body): Json<SignInRequest>,
) -> Result<Response, AuthServiceError> {
    let usecase = SignInUseCase {
        credentials: state.credential_repo(),
        sessions: state.session_repo(),
        cache: state.two_factor_cache(),
    };

    let outcome = usecase
        .execute(SignInInput {
            email: body.email,
            password: body.password,
            client: client_meta(&headers),
        })
        .await?;

    Ok(match outcome {
        SignInOutcome::SignedIn(session) => {
            let jar = set_session_cookie(jar, session.token.clone(), state.cookie_domain.clone());
            (StatusCode::CREATED, jar, Json(SessionResponse::from(&session))).into_response()
        }
        SignInOutcome::TwoFactorRequired { ticket } => (
            StatusCode::OK,
            Json(PendingTwoFactorResponse {
                pending_two_factor: true,
                ticket,
            }),
        )
            .into_response(),
    })
}

// ── POST /auth/sign-in/two-factor ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct VerifyTwoFactorRequest {
    pub ticket: String,
    pub code: String,
}

pub async fn verify_two_factor(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(body): Json<VerifyTwoFactorRequest>,
) -> Result<impl IntoResponse, AuthServiceError> {
    let usecase = VerifyTwoFactorUseCase {
        credentials: state.credential_repo(),
        sessions: state.session_repo(),
        backup_codes: state.backup_code_repo(),
        cache: state.two_factor_cache(),
        cipher: state.cipher.clone(),
    };

    let session = usecase
        .execute(VerifyTwoFactorInput {
            ticket: body.ticket,
            code: body.code,
            client: client_meta(&headers),
        })
        .await?;

    let jar = set_session_cookie(jar, session.token.clone(), state.cookie_domain.clone());
    Ok((StatusCode::CREATED, jar, Json(SessionResponse::from(&session))))
}
