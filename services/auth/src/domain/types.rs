use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// Credential record for one account, as read from the credential store.
#[derive(Debug, Clone)]
pub struct Credential {
    pub id: Uuid,
    pub email: String,
    /// Argon2id hash in PHC string format.
    pub password_hash: String,
    pub two_factor_enabled: bool,
    /// Encrypted TOTP secret (nonce prepended). Present from provisioning on;
    /// `two_factor_enabled` only flips once enrollment completes.
    pub totp_secret: Option<Vec<u8>>,
    /// Highest 30-second time step a code has been accepted for (replay guard).
    pub last_totp_step: Option<i64>,
}

/// One authenticated device/browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user_id: Uuid,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Expired sessions are inert: treated as absent everywhere, swept later.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// One-time-use recovery code (hash only; plaintext exists only at issuance).
#[derive(Debug, Clone)]
pub struct BackupCode {
    pub id: Uuid,
    pub user_id: Uuid,
    pub code_hash: String,
    pub used: bool,
}

/// Single-use password reset token delivered out-of-band.
#[derive(Debug, Clone)]
pub struct ResetToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ResetToken {
    pub fn is_valid(&self) -> bool {
        self.used_at.is_none() && self.expires_at > Utc::now()
    }

    pub fn issue(user_id: Uuid, token: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            token,
            expires_at: now + Duration::seconds(RESET_TOKEN_TTL_SECS),
            used_at: None,
            created_at: now,
        }
    }
}

/// Outbox event for async delivery (e.g. password-reset email).
#[derive(Debug, Clone)]
pub struct OutboxEvent {
    pub id: Uuid,
    pub kind: String,
    pub payload: serde_json::Value,
    pub idempotency_key: String,
}

/// Two-factor enrollment wizard position, re-validated server-side on every
/// transition. Linear, no back-edges except the explicit reset:
/// `verify-password → scan-qr → verify-code → backup-codes → completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollmentStep {
    /// Not enrolling: the next action is password re-proof (`enable`).
    VerifyPassword,
    /// Secret provisioned; client is showing the QR code.
    ScanQr,
    /// At least one wrong code submitted; still awaiting a valid one.
    VerifyCode,
    /// Code verified; client is showing the backup codes.
    BackupCodes,
    /// Enrollment finished; `two_factor_enabled` is true.
    Completed,
}

impl EnrollmentStep {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::VerifyPassword => "verify-password",
            Self::ScanQr => "scan-qr",
            Self::VerifyCode => "verify-code",
            Self::BackupCodes => "backup-codes",
            Self::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "verify-password" => Some(Self::VerifyPassword),
            "scan-qr" => Some(Self::ScanQr),
            "verify-code" => Some(Self::VerifyCode),
            "backup-codes" => Some(Self::BackupCodes),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// Pending-ticket time-to-live in seconds (password verified, 2FA outstanding).
pub const PENDING_TICKET_TTL_SECS: u64 = 300;

/// Enrollment step marker time-to-live in seconds.
pub const ENROLLMENT_STATE_TTL_SECS: u64 = 900;

/// Password reset token time-to-live in seconds.
pub const RESET_TOKEN_TTL_SECS: i64 = 1800;

/// Maximum number of active (unused, unexpired) reset tokens per user.
pub const MAX_ACTIVE_RESET_TOKENS: u64 = 3;

/// Session lifetime in days (fixed expiry, set at creation).
pub const SESSION_TTL_DAYS: i64 = 30;

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 8;
