//! Argon2id password hashing plus the change/reset flows.
//!
//! Hashes use the PHC string format so parameters and salt travel with the
//! hash. Reset tokens are single-use rows consumed with an only-if-unused
//! update; delivery happens through the transactional outbox.

use anyhow::anyhow;
use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use serde_json::json;
use uuid::Uuid;

use crate::domain::repository::{CredentialRepository, ResetTokenRepository, SessionRepository};
use crate::domain::types::{MAX_ACTIVE_RESET_TOKENS, MIN_PASSWORD_LEN, OutboxEvent, ResetToken};
use crate::error::AuthServiceError;
use crate::usecase::session::generate_token;

/// A syntactically valid Argon2id hash that no password produces. Verified
/// against when an email lookup misses, so the unknown-email and wrong-password
/// paths cost the same.
const DUMMY_PASSWORD_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$MDEyMzQ1Njc4OWFiY2RlZg$MDEyMzQ1Njc4OWFiY2RlZjAxMjM0NTY3ODlhYmNkZWY";

/// Hash a plaintext password using Argon2id with a random salt.
pub fn hash_password(password: &str) -> Result<String, AuthServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthServiceError::Storage(anyhow!("hash password: {e}")))?;
    Ok(hash.to_string())
}

/// Verify a plaintext password against a stored PHC-formatted hash.
/// `Ok(false)` on mismatch; `Err` only for malformed hashes (storage fault).
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthServiceError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AuthServiceError::Storage(anyhow!("invalid password hash: {e}")))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthServiceError::Storage(anyhow!("verify password: {e}"))),
    }
}

/// Burn one Argon2 verification so callers without a real hash take as long
/// as callers with one.
pub fn equalize_verification_cost(password: &str) {
    let _ = verify_password(password, DUMMY_PASSWORD_HASH);
}

/// Minimum-strength gate applied to every new password.
pub fn validate_password_strength(password: &str) -> Result<(), AuthServiceError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AuthServiceError::WeakPassword);
    }
    Ok(())
}

// ── ChangePassword ───────────────────────────────────────────────────────────

pub struct ChangePasswordInput {
    pub user_id: Uuid,
    /// Token of the caller's own session, spared when revoking others.
    pub current_token: String,
    pub current_password: String,
    pub new_password: String,
}

pub struct ChangePasswordUseCase<C, S>
where
    C: CredentialRepository,
    S: SessionRepository,
{
    pub credentials: C,
    pub sessions: S,
    /// When set, every session except the caller's is revoked on success.
    pub revoke_other_sessions: bool,
}

impl<C, S> ChangePasswordUseCase<C, S>
where
    C: CredentialRepository,
    S: SessionRepository,
{
    pub async fn execute(&self, input: ChangePasswordInput) -> Result<(), AuthServiceError> {
        let credential = self
            .credentials
            .find_by_id(input.user_id)
            .await?
            .ok_or(AuthServiceError::Unauthorized)?;

        if !verify_password(&input.current_password, &credential.password_hash)? {
            return Err(AuthServiceError::InvalidCredentials);
        }
        if verify_password(&input.new_password, &credential.password_hash)? {
            return Err(AuthServiceError::PasswordReuse);
        }
        validate_password_strength(&input.new_password)?;

        let new_hash = hash_password(&input.new_password)?;
        self.credentials
            .update_password_hash(input.user_id, &new_hash)
            .await?;

        if self.revoke_other_sessions {
            let revoked = self
                .sessions
                .delete_others(input.user_id, &input.current_token)
                .await?;
            tracing::info!(user_id = %input.user_id, revoked, "password changed, other sessions revoked");
        }
        Ok(())
    }
}

// ── RequestPasswordReset ─────────────────────────────────────────────────────

pub struct RequestPasswordResetUseCase<C, R>
where
    C: CredentialRepository,
    R: ResetTokenRepository,
{
    pub credentials: C,
    pub reset_tokens: R,
}

impl<C, R> RequestPasswordResetUseCase<C, R>
where
    C: CredentialRepository,
    R: ResetTokenRepository,
{
    /// Always resolves successfully for well-formed input: an unknown email
    /// and a known one are indistinguishable to the caller. Token delivery
    /// happens out-of-band via the outbox relay.
    pub async fn execute(&self, email: &str) -> Result<(), AuthServiceError> {
        let email = email.trim().to_lowercase();
        let Some(credential) = self.credentials.find_by_email(&email).await? else {
            tracing::debug!("password reset requested for unknown email");
            return Ok(());
        };

        let active = self.reset_tokens.count_active(credential.id).await?;
        if active >= MAX_ACTIVE_RESET_TOKENS {
            tracing::debug!(user_id = %credential.id, "password reset request dropped, too many active tokens");
            return Ok(());
        }

        let token = ResetToken::issue(credential.id, generate_token());
        let event = OutboxEvent {
            id: Uuid::new_v4(),
            kind: "password_reset_requested".to_owned(),
            payload: json!({ "email": email, "token": token.token }),
            idempotency_key: format!("password_reset_requested:{}", token.id),
        };
        self.reset_tokens.create_with_outbox(&token, &event).await
    }
}

// ── ResetPassword ────────────────────────────────────────────────────────────

pub struct ResetPasswordUseCase<C, S, R>
where
    C: CredentialRepository,
    S: SessionRepository,
    R: ResetTokenRepository,
{
    pub credentials: C,
    pub sessions: S,
    pub reset_tokens: R,
}

impl<C, S, R> ResetPasswordUseCase<C, S, R>
where
    C: CredentialRepository,
    S: SessionRepository,
    R: ResetTokenRepository,
{
    /// Consumes the token, replaces the hash, and invalidates every session
    /// for the user (forced re-login on all devices).
    pub async fn execute(
        &self,
        token_value: &str,
        new_password: &str,
    ) -> Result<(), AuthServiceError> {
        let token = self
            .reset_tokens
            .find_valid(token_value)
            .await?
            .ok_or(AuthServiceError::InvalidResetToken)?;

        // Checked before consuming the token so a weak password does not burn it.
        validate_password_strength(new_password)?;

        if !self.reset_tokens.mark_used(token.id).await? {
            return Err(AuthServiceError::InvalidResetToken);
        }

        let new_hash = hash_password(new_password)?;
        self.credentials
            .update_password_hash(token.user_id, &new_hash)
            .await?;

        let revoked = self.sessions.delete_all(token.user_id).await?;
        tracing::info!(user_id = %token.user_id, revoked, "password reset, all sessions revoked");
        Ok(())
    }
}
