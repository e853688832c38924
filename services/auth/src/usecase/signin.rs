//! Credential sign-in and pending-ticket two-factor verification.

use uuid::Uuid;

use crate::domain::repository::{
    BackupCodeRepository, CredentialRepository, SessionRepository, TwoFactorCache,
};
use crate::domain::types::Session;
use crate::error::AuthServiceError;
use crate::usecase::backup::verify_backup_code;
use crate::usecase::password::{equalize_verification_cost, verify_password};
use crate::usecase::session::generate_token;
use crate::usecase::totp::{SecretCipher, is_totp_format, matching_step, now_unix};

/// Client metadata captured on the new session.
#[derive(Debug, Clone, Default)]
pub struct ClientMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

// ── SignIn ───────────────────────────────────────────────────────────────────

pub struct SignInInput {
    pub email: String,
    pub password: String,
    pub client: ClientMeta,
}

/// Outcome of a password check. Needing a second factor is a branch of the
/// flow, not an error.
#[derive(Debug)]
pub enum SignInOutcome {
    SignedIn(Session),
    TwoFactorRequired { ticket: String },
}

pub struct SignInUseCase<C, S, T>
where
    C: CredentialRepository,
    S: SessionRepository,
    T: TwoFactorCache,
{
    pub credentials: C,
    pub sessions: S,
    pub cache: T,
}

impl<C, S, T> SignInUseCase<C, S, T>
where
    C: CredentialRepository,
    S: SessionRepository,
    T: TwoFactorCache,
{
    pub async fn execute(&self, input: SignInInput) -> Result<SignInOutcome, AuthServiceError> {
        let email = input.email.trim().to_lowercase();

        let Some(credential) = self.credentials.find_by_email(&email).await? else {
            // Same work as the found path, so timing does not reveal which
            // field was wrong.
            equalize_verification_cost(&input.password);
            return Err(AuthServiceError::InvalidCredentials);
        };

        if !verify_password(&input.password, &credential.password_hash)? {
            return Err(AuthServiceError::InvalidCredentials);
        }

        if credential.two_factor_enabled {
            let ticket = generate_token();
            self.cache.put_pending_ticket(&ticket, credential.id).await?;
            return Ok(SignInOutcome::TwoFactorRequired { ticket });
        }

        let session = Session::issue(
            credential.id,
            input.client.ip_address,
            input.client.user_agent,
        );
        self.sessions.create(&session).await?;
        Ok(SignInOutcome::SignedIn(session))
    }
}

// ── VerifyTwoFactor ──────────────────────────────────────────────────────────

pub struct VerifyTwoFactorInput {
    pub ticket: String,
    pub code: String,
    pub client: ClientMeta,
}

pub struct VerifyTwoFactorUseCase<C, S, B, T>
where
    C: CredentialRepository,
    S: SessionRepository,
    B: BackupCodeRepository,
    T: TwoFactorCache,
{
    pub credentials: C,
    pub sessions: S,
    pub backup_codes: B,
    pub cache: T,
    pub cipher: SecretCipher,
}

impl<C, S, B, T> VerifyTwoFactorUseCase<C, S, B, T>
where
    C: CredentialRepository,
    S: SessionRepository,
    B: BackupCodeRepository,
    T: TwoFactorCache,
{
    /// Verify a TOTP or backup code against the caller's pending ticket.
    ///
    /// A wrong code leaves the ticket intact so the user can retry until the
    /// TTL runs out. On success the ticket is taken atomically — concurrent
    /// submissions of the same ticket yield exactly one session.
    pub async fn execute(&self, input: VerifyTwoFactorInput) -> Result<Session, AuthServiceError> {
        let user_id = self
            .cache
            .peek_pending_ticket(&input.ticket)
            .await?
            .ok_or(AuthServiceError::TicketExpired)?;

        let credential = self
            .credentials
            .find_by_id(user_id)
            .await?
            .filter(|c| c.two_factor_enabled)
            .ok_or(AuthServiceError::TicketExpired)?;

        let code = input.code.trim();
        if is_totp_format(code) {
            self.verify_totp(&credential, code).await?;
        } else {
            self.verify_backup(user_id, code).await?;
        }

        if self.cache.take_pending_ticket(&input.ticket).await?.is_none() {
            return Err(AuthServiceError::TicketExpired);
        }

        let session = Session::issue(user_id, input.client.ip_address, input.client.user_agent);
        self.sessions.create(&session).await?;
        Ok(session)
    }

    async fn verify_totp(
        &self,
        credential: &crate::domain::types::Credential,
        code: &str,
    ) -> Result<(), AuthServiceError> {
        let Some(encrypted) = credential.totp_secret.as_deref() else {
            return Err(AuthServiceError::Storage(anyhow::anyhow!(
                "two-factor enabled without a stored secret"
            )));
        };
        let secret = self.cipher.decrypt(credential.id, encrypted)?;

        let step = matching_step(&secret, code, now_unix())?
            .ok_or(AuthServiceError::InvalidCode)?;

        // One-time use per step: losing the claim means this exact code was
        // already spent (capture-replay).
        if !self.credentials.claim_totp_step(credential.id, step).await? {
            return Err(AuthServiceError::InvalidCode);
        }
        Ok(())
    }

    async fn verify_backup(&self, user_id: Uuid, code: &str) -> Result<(), AuthServiceError> {
        let candidates = self.backup_codes.list_unused(user_id).await?;
        for candidate in &candidates {
            if verify_backup_code(code, &candidate.code_hash)? {
                // Atomic check-and-mark: exactly one of two concurrent spends
                // of the same code wins.
                if self.backup_codes.consume(candidate.id).await? {
                    return Ok(());
                }
                return Err(AuthServiceError::InvalidCode);
            }
        }
        Err(AuthServiceError::InvalidCode)
    }
}
