//! Two-factor enrollment state machine.
//!
//! Linear flow `verify-password → scan-qr → verify-code → backup-codes →
//! completed`, driven entirely by server-held state: the step marker lives in
//! the cache and is re-validated on every call, so a client cannot skip ahead
//! by fabricating its wizard position. The only back-edge is the explicit
//! reset, which returns to the start from any pre-completion state.

use uuid::Uuid;

use crate::domain::repository::{BackupCodeRepository, CredentialRepository, TwoFactorCache};
use crate::domain::types::{Credential, EnrollmentStep};
use crate::error::AuthServiceError;
use crate::usecase::backup::BackupCodeBatch;
use crate::usecase::password::verify_password;
use crate::usecase::totp::{SecretCipher, matching_step, now_unix, provision_secret};

async fn load_credential<C: CredentialRepository>(
    credentials: &C,
    user_id: Uuid,
) -> Result<Credential, AuthServiceError> {
    credentials
        .find_by_id(user_id)
        .await?
        .ok_or(AuthServiceError::Unauthorized)
}

// ── Enable ───────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct EnableTwoFactorOutput {
    pub secret_base32: String,
    pub otpauth_uri: String,
    /// Plaintext backup codes, shown exactly once. Useless until enrollment
    /// completes, since `two_factor_enabled` is still false.
    pub backup_codes: Vec<String>,
}

pub struct EnableTwoFactorUseCase<C, B, T>
where
    C: CredentialRepository,
    B: BackupCodeRepository,
    T: TwoFactorCache,
{
    pub credentials: C,
    pub backup_codes: B,
    pub cache: T,
    pub cipher: SecretCipher,
    pub issuer: String,
}

impl<C, B, T> EnableTwoFactorUseCase<C, B, T>
where
    C: CredentialRepository,
    B: BackupCodeRepository,
    T: TwoFactorCache,
{
    /// Password re-proof gates entry: a hijacked session alone cannot enroll
    /// a second factor.
    pub async fn execute(
        &self,
        user_id: Uuid,
        password: &str,
    ) -> Result<EnableTwoFactorOutput, AuthServiceError> {
        let credential = load_credential(&self.credentials, user_id).await?;
        if credential.two_factor_enabled {
            return Err(AuthServiceError::AlreadyEnrolled);
        }
        if !verify_password(password, &credential.password_hash)? {
            return Err(AuthServiceError::InvalidCredentials);
        }

        let provisioned = provision_secret(&self.issuer, &credential.email)?;
        let encrypted = self.cipher.encrypt(user_id, &provisioned.secret)?;
        self.credentials
            .store_pending_secret(user_id, &encrypted)
            .await?;

        let batch = BackupCodeBatch::generate()?;
        self.backup_codes
            .replace_for_user(user_id, &batch.code_hashes)
            .await?;

        self.cache
            .put_enrollment_step(user_id, EnrollmentStep::ScanQr)
            .await?;

        Ok(EnableTwoFactorOutput {
            secret_base32: provisioned.secret_base32,
            otpauth_uri: provisioned.otpauth_uri,
            backup_codes: batch.codes,
        })
    }
}

// ── Confirm code ─────────────────────────────────────────────────────────────

pub struct ConfirmEnrollmentUseCase<C, T>
where
    C: CredentialRepository,
    T: TwoFactorCache,
{
    pub credentials: C,
    pub cache: T,
    pub cipher: SecretCipher,
}

impl<C, T> ConfirmEnrollmentUseCase<C, T>
where
    C: CredentialRepository,
    T: TwoFactorCache,
{
    /// Verify the first code from the authenticator app. A wrong code keeps
    /// the flow at `verify-code`; retries are unlimited within the state TTL.
    pub async fn execute(&self, user_id: Uuid, code: &str) -> Result<(), AuthServiceError> {
        let step = self
            .cache
            .get_enrollment_step(user_id)
            .await?
            .ok_or(AuthServiceError::NotEnrolled)?;

        match step {
            EnrollmentStep::ScanQr | EnrollmentStep::VerifyCode => {}
            // Already verified; a duplicate submit is not an error.
            EnrollmentStep::BackupCodes => return Ok(()),
            _ => return Err(AuthServiceError::NotEnrolled),
        }

        let credential = load_credential(&self.credentials, user_id).await?;
        let Some(encrypted) = credential.totp_secret.as_deref() else {
            return Err(AuthServiceError::NotEnrolled);
        };
        let secret = self.cipher.decrypt(user_id, encrypted)?;

        let matched = matching_step(&secret, code.trim(), now_unix())?;
        let Some(matched) = matched else {
            self.cache
                .put_enrollment_step(user_id, EnrollmentStep::VerifyCode)
                .await?;
            return Err(AuthServiceError::InvalidCode);
        };

        // The replay guard applies during enrollment too.
        if !self.credentials.claim_totp_step(user_id, matched).await? {
            return Err(AuthServiceError::InvalidCode);
        }

        self.cache
            .put_enrollment_step(user_id, EnrollmentStep::BackupCodes)
            .await?;
        Ok(())
    }
}

// ── Complete ─────────────────────────────────────────────────────────────────

pub struct CompleteEnrollmentUseCase<C, T>
where
    C: CredentialRepository,
    T: TwoFactorCache,
{
    pub credentials: C,
    pub cache: T,
}

impl<C, T> CompleteEnrollmentUseCase<C, T>
where
    C: CredentialRepository,
    T: TwoFactorCache,
{
    /// Flip the enabled flag. Only reachable from `backup-codes`, and the
    /// store itself refuses to enable without a stored secret.
    pub async fn execute(&self, user_id: Uuid) -> Result<(), AuthServiceError> {
        let step = self
            .cache
            .get_enrollment_step(user_id)
            .await?
            .ok_or(AuthServiceError::NotEnrolled)?;
        if step != EnrollmentStep::BackupCodes {
            return Err(AuthServiceError::NotEnrolled);
        }

        if !self.credentials.enable_two_factor(user_id).await? {
            return Err(AuthServiceError::NotEnrolled);
        }

        self.cache.clear_enrollment(user_id).await?;
        tracing::info!(user_id = %user_id, "two-factor enabled");
        Ok(())
    }
}

// ── Reset ────────────────────────────────────────────────────────────────────

pub struct ResetEnrollmentUseCase<C, B, T>
where
    C: CredentialRepository,
    B: BackupCodeRepository,
    T: TwoFactorCache,
{
    pub credentials: C,
    pub backup_codes: B,
    pub cache: T,
}

impl<C, B, T> ResetEnrollmentUseCase<C, B, T>
where
    C: CredentialRepository,
    B: BackupCodeRepository,
    T: TwoFactorCache,
{
    /// Abandon an in-progress enrollment: wipe the pending secret, codes, and
    /// step marker. Refused once enrollment has completed — that requires
    /// `disable` with its password gate.
    pub async fn execute(&self, user_id: Uuid) -> Result<(), AuthServiceError> {
        let credential = load_credential(&self.credentials, user_id).await?;
        if credential.two_factor_enabled {
            return Err(AuthServiceError::AlreadyEnrolled);
        }

        self.cache.clear_enrollment(user_id).await?;
        self.credentials.clear_two_factor(user_id).await?;
        self.backup_codes.delete_for_user(user_id).await?;
        Ok(())
    }
}

// ── Disable ──────────────────────────────────────────────────────────────────

pub struct DisableTwoFactorUseCase<C, B, T>
where
    C: CredentialRepository,
    B: BackupCodeRepository,
    T: TwoFactorCache,
{
    pub credentials: C,
    pub backup_codes: B,
    pub cache: T,
}

impl<C, B, T> DisableTwoFactorUseCase<C, B, T>
where
    C: CredentialRepository,
    B: BackupCodeRepository,
    T: TwoFactorCache,
{
    /// The password is the sole gate — no fresh code is demanded, trading
    /// strictness for not locking out users who lost their device.
    /// Irreversible: re-enabling starts a full provisioning run.
    pub async fn execute(&self, user_id: Uuid, password: &str) -> Result<(), AuthServiceError> {
        let credential = load_credential(&self.credentials, user_id).await?;
        if !verify_password(password, &credential.password_hash)? {
            return Err(AuthServiceError::InvalidCredentials);
        }
        if !credential.two_factor_enabled {
            return Err(AuthServiceError::NotEnrolled);
        }

        self.credentials.clear_two_factor(user_id).await?;
        self.backup_codes.delete_for_user(user_id).await?;
        self.cache.clear_enrollment(user_id).await?;
        tracing::info!(user_id = %user_id, "two-factor disabled");
        Ok(())
    }
}

// ── Status ───────────────────────────────────────────────────────────────────

pub struct TwoFactorStatus {
    pub enabled: bool,
    pub step: EnrollmentStep,
}

pub struct TwoFactorStatusUseCase<C, T>
where
    C: CredentialRepository,
    T: TwoFactorCache,
{
    pub credentials: C,
    pub cache: T,
}

impl<C, T> TwoFactorStatusUseCase<C, T>
where
    C: CredentialRepository,
    T: TwoFactorCache,
{
    /// Server-truth wizard position, so a reloaded client resumes where the
    /// server left it rather than where it believes it was.
    pub async fn execute(&self, user_id: Uuid) -> Result<TwoFactorStatus, AuthServiceError> {
        let credential = load_credential(&self.credentials, user_id).await?;
        if credential.two_factor_enabled {
            return Ok(TwoFactorStatus {
                enabled: true,
                step: EnrollmentStep::Completed,
            });
        }
        let step = self
            .cache
            .get_enrollment_step(user_id)
            .await?
            .unwrap_or(EnrollmentStep::VerifyPassword);
        Ok(TwoFactorStatus {
            enabled: false,
            step,
        })
    }
}
