#![allow(async_fn_in_trait)]

use uuid::Uuid;

use crate::domain::types::{BackupCode, Credential, EnrollmentStep, OutboxEvent, ResetToken, Session};
use crate::error::AuthServiceError;

/// Repository for user credentials (identity, password hash, TOTP state).
pub trait CredentialRepository: Send + Sync {
    /// Look up by email. Callers pass the normalized (lowercase) form.
    async fn find_by_email(&self, email: &str) -> Result<Option<Credential>, AuthServiceError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Credential>, AuthServiceError>;

    async fn update_password_hash(
        &self,
        user_id: Uuid,
        password_hash: &str,
    ) -> Result<(), AuthServiceError>;

    /// Store a freshly provisioned (encrypted) secret with the enabled flag
    /// still false; also resets the replay guard.
    async fn store_pending_secret(
        &self,
        user_id: Uuid,
        secret: &[u8],
    ) -> Result<(), AuthServiceError>;

    /// Flip `two_factor_enabled` on. Returns `false` when no secret is stored —
    /// the store refuses to enable two-factor without one.
    async fn enable_two_factor(&self, user_id: Uuid) -> Result<bool, AuthServiceError>;

    /// Clear secret, replay guard, and the enabled flag. Irreversible.
    async fn clear_two_factor(&self, user_id: Uuid) -> Result<(), AuthServiceError>;

    /// Atomically claim a TOTP time step: succeeds only when `step` is greater
    /// than any previously claimed step. A `false` return means the same (or a
    /// later) step was already consumed — reject the code as a replay.
    async fn claim_totp_step(&self, user_id: Uuid, step: i64) -> Result<bool, AuthServiceError>;
}

/// Repository for sessions.
pub trait SessionRepository: Send + Sync {
    async fn create(&self, session: &Session) -> Result<(), AuthServiceError>;

    /// Find a live session by token. Expired sessions are treated as absent.
    async fn find_by_token(&self, token: &str) -> Result<Option<Session>, AuthServiceError>;

    /// Refresh `updated_at`. A missing row is not an error.
    async fn touch(&self, token: &str) -> Result<(), AuthServiceError>;

    /// Live sessions for a user, most recent first.
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Session>, AuthServiceError>;

    /// Delete one session scoped to its owner. Returns `false` if absent.
    async fn delete(&self, user_id: Uuid, token: &str) -> Result<bool, AuthServiceError>;

    /// Delete every session for the user except `except_token`.
    async fn delete_others(
        &self,
        user_id: Uuid,
        except_token: &str,
    ) -> Result<u64, AuthServiceError>;

    /// Delete every session for the user, the caller's included.
    async fn delete_all(&self, user_id: Uuid) -> Result<u64, AuthServiceError>;
}

/// Repository for backup codes.
pub trait BackupCodeRepository: Send + Sync {
    /// Replace the user's whole batch in one transaction.
    async fn replace_for_user(
        &self,
        user_id: Uuid,
        code_hashes: &[String],
    ) -> Result<(), AuthServiceError>;

    async fn list_unused(&self, user_id: Uuid) -> Result<Vec<BackupCode>, AuthServiceError>;

    /// Mark a code used, only if it is still unused. A `false` return means a
    /// concurrent request spent it first.
    async fn consume(&self, id: Uuid) -> Result<bool, AuthServiceError>;

    async fn delete_for_user(&self, user_id: Uuid) -> Result<(), AuthServiceError>;
}

/// Repository for single-use password reset tokens.
pub trait ResetTokenRepository: Send + Sync {
    /// Count active (unused and unexpired) tokens for a user.
    async fn count_active(&self, user_id: Uuid) -> Result<u64, AuthServiceError>;

    /// Insert a new token and an outbox event atomically (same transaction).
    async fn create_with_outbox(
        &self,
        token: &ResetToken,
        event: &OutboxEvent,
    ) -> Result<(), AuthServiceError>;

    /// Find a valid (unused, unexpired) token by its opaque value.
    async fn find_valid(&self, token: &str) -> Result<Option<ResetToken>, AuthServiceError>;

    /// Mark a token used, only if it is still unused. A `false` return means a
    /// concurrent request spent it first.
    async fn mark_used(&self, id: Uuid) -> Result<bool, AuthServiceError>;
}

/// Cache for ephemeral two-factor state (Redis, short TTL).
pub trait TwoFactorCache: Send + Sync {
    /// Store a pending ticket → user mapping with the ticket TTL.
    async fn put_pending_ticket(
        &self,
        ticket: &str,
        user_id: Uuid,
    ) -> Result<(), AuthServiceError>;

    /// Read a pending ticket without consuming it (code verification may fail
    /// and the caller retries against the same ticket).
    async fn peek_pending_ticket(&self, ticket: &str) -> Result<Option<Uuid>, AuthServiceError>;

    /// Consume a pending ticket (single use, atomic take).
    async fn take_pending_ticket(&self, ticket: &str) -> Result<Option<Uuid>, AuthServiceError>;

    async fn put_enrollment_step(
        &self,
        user_id: Uuid,
        step: EnrollmentStep,
    ) -> Result<(), AuthServiceError>;

    async fn get_enrollment_step(
        &self,
        user_id: Uuid,
    ) -> Result<Option<EnrollmentStep>, AuthServiceError>;

    async fn clear_enrollment(&self, user_id: Uuid) -> Result<(), AuthServiceError>;
}
