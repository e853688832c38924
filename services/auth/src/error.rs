use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Auth service domain error variants.
///
/// Two-factor being required during sign-in is a flow branch, not an error —
/// see `SignInOutcome`. Messages stay generic on purpose: nothing here may
/// disclose whether an email exists or which credential field was wrong.
#[derive(Debug, thiserror::Error)]
pub enum AuthServiceError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("invalid code")]
    InvalidCode,
    #[error("sign-in ticket expired")]
    TicketExpired,
    #[error("invalid reset token")]
    InvalidResetToken,
    #[error("two-factor already enabled")]
    AlreadyEnrolled,
    #[error("two-factor not enabled")]
    NotEnrolled,
    #[error("password too weak")]
    WeakPassword,
    #[error("new password must differ from the current one")]
    PasswordReuse,
    #[error("unauthorized")]
    Unauthorized,
    #[error("storage unavailable")]
    Storage(#[from] anyhow::Error),
}

impl AuthServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::InvalidCode => "INVALID_CODE",
            Self::TicketExpired => "TICKET_EXPIRED",
            Self::InvalidResetToken => "INVALID_RESET_TOKEN",
            Self::AlreadyEnrolled => "ALREADY_ENROLLED",
            Self::NotEnrolled => "NOT_ENROLLED",
            Self::WeakPassword => "WEAK_PASSWORD",
            Self::PasswordReuse => "PASSWORD_REUSE",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Storage(_) => "STORAGE_UNAVAILABLE",
        }
    }
}

impl IntoResponse for AuthServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::InvalidCredentials
            | Self::InvalidCode
            | Self::TicketExpired
            | Self::InvalidResetToken
            | Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::AlreadyEnrolled | Self::NotEnrolled => StatusCode::CONFLICT,
            Self::WeakPassword | Self::PasswordReuse => StatusCode::BAD_REQUEST,
            Self::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        // Log storage faults only — tower-http TraceLayer already records
        // method/uri/status for all requests. 4xx are expected client errors;
        // logging them here would be noise. Storage errors need the anyhow
        // chain logged so the root cause is traceable.
        if let Self::Storage(ref e) = self {
            tracing::error!(error = %e, kind = "STORAGE_UNAVAILABLE", "storage unavailable");
        }
        let body = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}
