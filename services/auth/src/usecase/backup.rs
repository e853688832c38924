//! Backup-code generation, hashing, and verification.
//!
//! A batch of 10 codes is issued per enrollment and fully replaced on
//! re-enrollment. Codes are 12 characters from an unambiguous alphabet
//! (no 0/O/1/I), shown to the user as `XXXX-XXXX-XXXX`, and stored only as
//! salted Argon2id hashes.

use anyhow::anyhow;
use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use rand::RngExt;

use crate::error::AuthServiceError;

/// Codes issued per enrollment.
pub const BACKUP_CODE_COUNT: usize = 10;

const CODE_LEN: usize = 12;
const GROUP_SIZE: usize = 4;
const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// A freshly generated batch: plaintext for one-time display, hashes for storage.
pub struct BackupCodeBatch {
    pub codes: Vec<String>,
    pub code_hashes: Vec<String>,
}

impl BackupCodeBatch {
    pub fn generate() -> Result<Self, AuthServiceError> {
        let mut codes = Vec::with_capacity(BACKUP_CODE_COUNT);
        let mut code_hashes = Vec::with_capacity(BACKUP_CODE_COUNT);
        for _ in 0..BACKUP_CODE_COUNT {
            let code = generate_code();
            let hash = hash_backup_code(&code)?;
            codes.push(code);
            code_hashes.push(hash);
        }
        Ok(Self { codes, code_hashes })
    }
}

fn generate_code() -> String {
    let mut rng = rand::rng();
    let normalized: String = (0..CODE_LEN)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect();
    format_code(&normalized)
}

fn format_code(normalized: &str) -> String {
    let mut out = String::with_capacity(CODE_LEN + 2);
    for (idx, chunk) in normalized.as_bytes().chunks(GROUP_SIZE).enumerate() {
        if idx > 0 {
            out.push('-');
        }
        out.push_str(std::str::from_utf8(chunk).expect("alphabet is ASCII"));
    }
    out
}

/// Strip separators and uppercase. `None` when the result does not look like
/// a backup code at all (wrong length or characters outside the alphabet).
pub fn normalize_backup_code(input: &str) -> Option<String> {
    let normalized: String = input
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|ch| ch.to_ascii_uppercase())
        .collect();

    if normalized.len() != CODE_LEN {
        return None;
    }
    if !normalized.as_bytes().iter().all(|ch| ALPHABET.contains(ch)) {
        return None;
    }
    Some(normalized)
}

fn hash_backup_code(code: &str) -> Result<String, AuthServiceError> {
    let normalized =
        normalize_backup_code(code).ok_or_else(|| anyhow!("generated code failed validation"))?;
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(normalized.as_bytes(), &salt)
        .map_err(|e| AuthServiceError::Storage(anyhow!("hash backup code: {e}")))?;
    Ok(hash.to_string())
}

/// Verify a submitted code against a stored hash. Unparseable input verifies
/// as false rather than erroring — the caller treats it as a miss.
pub fn verify_backup_code(code: &str, stored_hash: &str) -> Result<bool, AuthServiceError> {
    let Some(normalized) = normalize_backup_code(code) else {
        return Ok(false);
    };
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| AuthServiceError::Storage(anyhow!("invalid backup code hash: {e}")))?;
    Ok(Argon2::default()
        .verify_password(normalized.as_bytes(), &parsed)
        .is_ok())
}
