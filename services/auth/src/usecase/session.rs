//! Session issuance, resolution, listing, and revocation.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{Duration, Utc};
use rand::RngExt;
use uuid::Uuid;

use crate::domain::repository::SessionRepository;
use crate::domain::types::{SESSION_TTL_DAYS, Session};
use crate::error::AuthServiceError;

/// Generate an opaque bearer token: 32 random bytes (256 bits of entropy),
/// base64url without padding. Also used for pending tickets and reset tokens.
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(bytes)
}

impl Session {
    /// Build a new session for a user with a fixed 30-day expiry.
    pub fn issue(user_id: Uuid, ip_address: Option<String>, user_agent: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            token: generate_token(),
            user_id,
            ip_address,
            user_agent,
            created_at: now,
            updated_at: now,
            expires_at: now + Duration::days(SESSION_TTL_DAYS),
        }
    }
}

// ── Authenticate ─────────────────────────────────────────────────────────────

pub struct AuthenticateSessionUseCase<S: SessionRepository> {
    pub sessions: S,
}

impl<S: SessionRepository> AuthenticateSessionUseCase<S> {
    /// Resolve a presented token to its session. Absent and expired tokens are
    /// indistinguishable to the caller.
    pub async fn execute(&self, token: &str) -> Result<Session, AuthServiceError> {
        let session = self
            .sessions
            .find_by_token(token)
            .await?
            .filter(|s| s.is_active(Utc::now()))
            .ok_or(AuthServiceError::Unauthorized)?;

        self.sessions.touch(&session.token).await?;
        Ok(session)
    }
}

// ── List ─────────────────────────────────────────────────────────────────────

pub struct ListSessionsUseCase<S: SessionRepository> {
    pub sessions: S,
}

impl<S: SessionRepository> ListSessionsUseCase<S> {
    /// Live sessions for the user, most recent first.
    pub async fn execute(&self, user_id: Uuid) -> Result<Vec<Session>, AuthServiceError> {
        self.sessions.list_by_user(user_id).await
    }
}

// ── Revoke one ───────────────────────────────────────────────────────────────

pub struct RevokeSessionUseCase<S: SessionRepository> {
    pub sessions: S,
}

impl<S: SessionRepository> RevokeSessionUseCase<S> {
    /// Idempotent: revoking an already-gone token is not an error. Scoped to
    /// the owner, so one user cannot revoke another's session by token.
    pub async fn execute(&self, user_id: Uuid, token: &str) -> Result<(), AuthServiceError> {
        let _ = self.sessions.delete(user_id, token).await?;
        Ok(())
    }
}

// ── Revoke others ────────────────────────────────────────────────────────────

pub struct RevokeOtherSessionsUseCase<S: SessionRepository> {
    pub sessions: S,
}

impl<S: SessionRepository> RevokeOtherSessionsUseCase<S> {
    pub async fn execute(
        &self,
        user_id: Uuid,
        except_token: &str,
    ) -> Result<u64, AuthServiceError> {
        self.sessions.delete_others(user_id, except_token).await
    }
}

// ── Revoke all ───────────────────────────────────────────────────────────────

pub struct RevokeAllSessionsUseCase<S: SessionRepository> {
    pub sessions: S,
}

impl<S: SessionRepository> RevokeAllSessionsUseCase<S> {
    /// Deletes the caller's own session too — the caller is logged out after.
    pub async fn execute(&self, user_id: Uuid) -> Result<u64, AuthServiceError> {
        self.sessions.delete_all(user_id).await
    }
}
