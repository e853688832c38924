//! TOTP secret provisioning, at-rest encryption, and code verification.
//!
//! Codes are RFC 6238 TOTP-SHA1: 6 zero-padded digits over 30-second steps,
//! with ±1 step of clock-skew tolerance. Verification reports *which* step
//! matched so the caller can claim it atomically and reject replays of the
//! same code within its window.

use anyhow::anyhow;
use chacha20poly1305::{
    ChaCha20Poly1305, Key, Nonce,
    aead::{Aead, KeyInit, Payload},
};
use rand::RngExt;
use totp_rs::{Algorithm, Secret, TOTP};
use uuid::Uuid;

use crate::error::AuthServiceError;

/// Number of digits in a TOTP code.
pub const TOTP_DIGITS: usize = 6;

/// TOTP time-step length in seconds.
pub const TOTP_STEP_SECS: u64 = 30;

/// Accepted clock skew, in steps, on either side of the current one.
pub const TOTP_SKEW_STEPS: u8 = 1;

/// Current unix time in seconds.
pub fn now_unix() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock before UNIX epoch")
        .as_secs()
}

/// True when the input has the shape of a TOTP code (exactly 6 ASCII digits).
pub fn is_totp_format(code: &str) -> bool {
    code.len() == TOTP_DIGITS && code.bytes().all(|b| b.is_ascii_digit())
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Build a TOTP instance for a raw secret. The label only matters for the
/// provisioning URI; verification callers pass a placeholder.
pub fn build_totp(
    secret: Vec<u8>,
    issuer: Option<String>,
    account: String,
) -> Result<TOTP, AuthServiceError> {
    TOTP::new(
        Algorithm::SHA1,
        TOTP_DIGITS,
        TOTP_SKEW_STEPS,
        TOTP_STEP_SECS,
        secret,
        issuer,
        account,
    )
    .map_err(|e| AuthServiceError::Storage(anyhow!("build totp: {e}")))
}

/// A freshly generated shared secret in the three shapes callers need.
pub struct ProvisionedSecret {
    /// Raw secret bytes (160 bits), to be encrypted before storage.
    pub secret: Vec<u8>,
    /// Base32 form for manual entry in an authenticator app.
    pub secret_base32: String,
    /// otpauth:// key URI for QR rendering.
    pub otpauth_uri: String,
}

/// Generate a new random 160-bit secret plus its key URI for the account.
pub fn provision_secret(
    issuer: &str,
    account_email: &str,
) -> Result<ProvisionedSecret, AuthServiceError> {
    let secret = Secret::generate_secret()
        .to_bytes()
        .map_err(|e| AuthServiceError::Storage(anyhow!("generate totp secret: {e}")))?;
    let totp = build_totp(
        secret.clone(),
        Some(issuer.to_owned()),
        account_email.to_owned(),
    )?;
    Ok(ProvisionedSecret {
        secret_base32: totp.get_secret_base32(),
        otpauth_uri: totp.get_url(),
        secret,
    })
}

/// Check a submitted code against the valid codes for the current and ±1
/// adjacent time steps, comparing in constant time. Returns the step that
/// matched, or `None` — callers must then claim the step before accepting.
pub fn matching_step(
    secret: &[u8],
    code: &str,
    now: u64,
) -> Result<Option<i64>, AuthServiceError> {
    if !is_totp_format(code) {
        return Ok(None);
    }
    let totp = build_totp(secret.to_vec(), None, "account".to_owned())?;

    // Evaluate the whole window regardless of an early match.
    let mut matched = None;
    for offset in [-1i64, 0, 1] {
        let t = now as i64 + offset * TOTP_STEP_SECS as i64;
        if t < 0 {
            continue;
        }
        let expected = totp.generate(t as u64);
        if constant_time_eq(&expected, code) && matched.is_none() {
            matched = Some(t / TOTP_STEP_SECS as i64);
        }
    }
    Ok(matched)
}

/// Encrypts TOTP secrets at rest with ChaCha20-Poly1305, binding the
/// ciphertext to its owner via AAD. Layout: `nonce (12 bytes) || ciphertext`.
#[derive(Clone)]
pub struct SecretCipher {
    key: [u8; 32],
}

fn secret_aad(user_id: Uuid) -> Vec<u8> {
    format!("totp-secret:v1|{user_id}").into_bytes()
}

impl SecretCipher {
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    pub fn encrypt(&self, user_id: Uuid, secret: &[u8]) -> Result<Vec<u8>, AuthServiceError> {
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&self.key));
        let nonce_bytes: [u8; 12] = rand::rng().random();
        let nonce = Nonce::from_slice(&nonce_bytes);

        let aad = secret_aad(user_id);
        let payload = Payload {
            msg: secret,
            aad: &aad,
        };
        let ciphertext = cipher
            .encrypt(nonce, payload)
            .map_err(|e| AuthServiceError::Storage(anyhow!("secret encryption failed: {e}")))?;

        let mut result = Vec::with_capacity(nonce_bytes.len() + ciphertext.len());
        result.extend_from_slice(&nonce_bytes);
        result.extend_from_slice(&ciphertext);
        Ok(result)
    }

    /// Fails closed: any truncation, tampering, or wrong-owner data surfaces
    /// as a storage error, never as a successful decrypt.
    pub fn decrypt(&self, user_id: Uuid, data: &[u8]) -> Result<Vec<u8>, AuthServiceError> {
        if data.len() < 12 {
            return Err(AuthServiceError::Storage(anyhow!(
                "stored secret too short"
            )));
        }
        let (nonce_bytes, ciphertext) = data.split_at(12);
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&self.key));

        let aad = secret_aad(user_id);
        let payload = Payload {
            msg: ciphertext,
            aad: &aad,
        };
        cipher
            .decrypt(Nonce::from_slice(nonce_bytes), payload)
            .map_err(|e| AuthServiceError::Storage(anyhow!("secret decryption failed: {e}")))
    }
}

impl std::fmt::Debug for SecretCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretCipher")
            .field("key", &"[REDACTED]")
            .finish()
    }
}
