use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use uuid::Uuid;

use vantra_auth::domain::repository::{
    BackupCodeRepository, CredentialRepository, ResetTokenRepository, SessionRepository,
    TwoFactorCache,
};
use vantra_auth::domain::types::{
    BackupCode, Credential, EnrollmentStep, OutboxEvent, ResetToken, Session,
};
use vantra_auth::error::AuthServiceError;
use vantra_auth::usecase::password::hash_password;
use vantra_auth::usecase::totp::SecretCipher;

// ── MockCredentialRepo ───────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MockCredentialRepo {
    pub credentials: Arc<Mutex<Vec<Credential>>>,
}

impl MockCredentialRepo {
    pub fn new(credentials: Vec<Credential>) -> Self {
        Self {
            credentials: Arc::new(Mutex::new(credentials)),
        }
    }

    pub fn empty() -> Self {
        Self::new(vec![])
    }

    /// Shared handle for post-execution inspection.
    pub fn handle(&self) -> Arc<Mutex<Vec<Credential>>> {
        Arc::clone(&self.credentials)
    }
}

impl CredentialRepository for MockCredentialRepo {
    async fn find_by_email(&self, email: &str) -> Result<Option<Credential>, AuthServiceError> {
        Ok(self
            .credentials
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Credential>, AuthServiceError> {
        Ok(self
            .credentials
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn update_password_hash(
        &self,
        user_id: Uuid,
        password_hash: &str,
    ) -> Result<(), AuthServiceError> {
        let mut credentials = self.credentials.lock().unwrap();
        if let Some(c) = credentials.iter_mut().find(|c| c.id == user_id) {
            c.password_hash = password_hash.to_owned();
        }
        Ok(())
    }

    async fn store_pending_secret(
        &self,
        user_id: Uuid,
        secret: &[u8],
    ) -> Result<(), AuthServiceError> {
        let mut credentials = self.credentials.lock().unwrap();
        if let Some(c) = credentials.iter_mut().find(|c| c.id == user_id) {
            c.totp_secret = Some(secret.to_vec());
            c.two_factor_enabled = false;
            c.last_totp_step = None;
        }
        Ok(())
    }

    async fn enable_two_factor(&self, user_id: Uuid) -> Result<bool, AuthServiceError> {
        let mut credentials = self.credentials.lock().unwrap();
        match credentials.iter_mut().find(|c| c.id == user_id) {
            Some(c) if c.totp_secret.is_some() => {
                c.two_factor_enabled = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn clear_two_factor(&self, user_id: Uuid) -> Result<(), AuthServiceError> {
        let mut credentials = self.credentials.lock().unwrap();
        if let Some(c) = credentials.iter_mut().find(|c| c.id == user_id) {
            c.two_factor_enabled = false;
            c.totp_secret = None;
            c.last_totp_step = None;
        }
        Ok(())
    }

    async fn claim_totp_step(&self, user_id: Uuid, step: i64) -> Result<bool, AuthServiceError> {
        let mut credentials = self.credentials.lock().unwrap();
        let Some(c) = credentials.iter_mut().find(|c| c.id == user_id) else {
            return Ok(false);
        };
        if c.last_totp_step.is_none_or(|last| last < step) {
            c.last_totp_step = Some(step);
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

// ── MockSessionRepo ──────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MockSessionRepo {
    pub sessions: Arc<Mutex<Vec<Session>>>,
}

impl MockSessionRepo {
    pub fn new(sessions: Vec<Session>) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(sessions)),
        }
    }

    pub fn empty() -> Self {
        Self::new(vec![])
    }

    pub fn handle(&self) -> Arc<Mutex<Vec<Session>>> {
        Arc::clone(&self.sessions)
    }
}

impl SessionRepository for MockSessionRepo {
    async fn create(&self, session: &Session) -> Result<(), AuthServiceError> {
        self.sessions.lock().unwrap().push(session.clone());
        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<Session>, AuthServiceError> {
        let now = Utc::now();
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.token == token && s.is_active(now))
            .cloned())
    }

    async fn touch(&self, token: &str) -> Result<(), AuthServiceError> {
        let mut sessions = self.sessions.lock().unwrap();
        if let Some(s) = sessions.iter_mut().find(|s| s.token == token) {
            s.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Session>, AuthServiceError> {
        let now = Utc::now();
        let mut live: Vec<Session> = self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.user_id == user_id && s.is_active(now))
            .cloned()
            .collect();
        live.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(live)
    }

    async fn delete(&self, user_id: Uuid, token: &str) -> Result<bool, AuthServiceError> {
        let mut sessions = self.sessions.lock().unwrap();
        let before = sessions.len();
        sessions.retain(|s| !(s.user_id == user_id && s.token == token));
        Ok(sessions.len() < before)
    }

    async fn delete_others(
        &self,
        user_id: Uuid,
        except_token: &str,
    ) -> Result<u64, AuthServiceError> {
        let mut sessions = self.sessions.lock().unwrap();
        let before = sessions.len();
        sessions.retain(|s| s.user_id != user_id || s.token == except_token);
        Ok((before - sessions.len()) as u64)
    }

    async fn delete_all(&self, user_id: Uuid) -> Result<u64, AuthServiceError> {
        let mut sessions = self.sessions.lock().unwrap();
        let before = sessions.len();
        sessions.retain(|s| s.user_id != user_id);
        Ok((before - sessions.len()) as u64)
    }
}

// ── MockBackupCodeRepo ───────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MockBackupCodeRepo {
    pub codes: Arc<Mutex<Vec<BackupCode>>>,
}

impl MockBackupCodeRepo {
    pub fn empty() -> Self {
        Self {
            codes: Arc::new(Mutex::new(vec![])),
        }
    }

    pub fn handle(&self) -> Arc<Mutex<Vec<BackupCode>>> {
        Arc::clone(&self.codes)
    }
}

impl BackupCodeRepository for MockBackupCodeRepo {
    async fn replace_for_user(
        &self,
        user_id: Uuid,
        code_hashes: &[String],
    ) -> Result<(), AuthServiceError> {
        let mut codes = self.codes.lock().unwrap();
        codes.retain(|c| c.user_id != user_id);
        for hash in code_hashes {
            codes.push(BackupCode {
                id: Uuid::new_v4(),
                user_id,
                code_hash: hash.clone(),
                used: false,
            });
        }
        Ok(())
    }

    async fn list_unused(&self, user_id: Uuid) -> Result<Vec<BackupCode>, AuthServiceError> {
        Ok(self
            .codes
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.user_id == user_id && !c.used)
            .cloned()
            .collect())
    }

    async fn consume(&self, id: Uuid) -> Result<bool, AuthServiceError> {
        let mut codes = self.codes.lock().unwrap();
        match codes.iter_mut().find(|c| c.id == id) {
            Some(c) if !c.used => {
                c.used = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_for_user(&self, user_id: Uuid) -> Result<(), AuthServiceError> {
        self.codes.lock().unwrap().retain(|c| c.user_id != user_id);
        Ok(())
    }
}

// ── MockResetTokenRepo ───────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MockResetTokenRepo {
    pub tokens: Arc<Mutex<Vec<ResetToken>>>,
    pub events: Arc<Mutex<Vec<OutboxEvent>>>,
}

impl MockResetTokenRepo {
    pub fn empty() -> Self {
        Self {
            tokens: Arc::new(Mutex::new(vec![])),
            events: Arc::new(Mutex::new(vec![])),
        }
    }

    pub fn tokens_handle(&self) -> Arc<Mutex<Vec<ResetToken>>> {
        Arc::clone(&self.tokens)
    }

    pub fn events_handle(&self) -> Arc<Mutex<Vec<OutboxEvent>>> {
        Arc::clone(&self.events)
    }
}

impl ResetTokenRepository for MockResetTokenRepo {
    async fn count_active(&self, user_id: Uuid) -> Result<u64, AuthServiceError> {
        Ok(self
            .tokens
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.user_id == user_id && t.is_valid())
            .count() as u64)
    }

    async fn create_with_outbox(
        &self,
        token: &ResetToken,
        event: &OutboxEvent,
    ) -> Result<(), AuthServiceError> {
        self.tokens.lock().unwrap().push(token.clone());
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }

    async fn find_valid(&self, token: &str) -> Result<Option<ResetToken>, AuthServiceError> {
        Ok(self
            .tokens
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.token == token && t.is_valid())
            .cloned())
    }

    async fn mark_used(&self, id: Uuid) -> Result<bool, AuthServiceError> {
        let mut tokens = self.tokens.lock().unwrap();
        match tokens.iter_mut().find(|t| t.id == id) {
            Some(t) if t.used_at.is_none() => {
                t.used_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

// ── MockTwoFactorCache ───────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MockTwoFactorCache {
    pub tickets: Arc<Mutex<HashMap<String, Uuid>>>,
    pub steps: Arc<Mutex<HashMap<Uuid, EnrollmentStep>>>,
}

impl MockTwoFactorCache {
    pub fn empty() -> Self {
        Self {
            tickets: Arc::new(Mutex::new(HashMap::new())),
            steps: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl TwoFactorCache for MockTwoFactorCache {
    async fn put_pending_ticket(
        &self,
        ticket: &str,
        user_id: Uuid,
    ) -> Result<(), AuthServiceError> {
        self.tickets.lock().unwrap().insert(ticket.to_owned(), user_id);
        Ok(())
    }

    async fn peek_pending_ticket(&self, ticket: &str) -> Result<Option<Uuid>, AuthServiceError> {
        Ok(self.tickets.lock().unwrap().get(ticket).copied())
    }

    async fn take_pending_ticket(&self, ticket: &str) -> Result<Option<Uuid>, AuthServiceError> {
        Ok(self.tickets.lock().unwrap().remove(ticket))
    }

    async fn put_enrollment_step(
        &self,
        user_id: Uuid,
        step: EnrollmentStep,
    ) -> Result<(), AuthServiceError> {
        self.steps.lock().unwrap().insert(user_id, step);
        Ok(())
    }

    async fn get_enrollment_step(
        &self,
        user_id: Uuid,
    ) -> Result<Option<EnrollmentStep>, AuthServiceError> {
        Ok(self.steps.lock().unwrap().get(&user_id).copied())
    }

    async fn clear_enrollment(&self, user_id: Uuid) -> Result<(), AuthServiceError> {
        self.steps.lock().unwrap().remove(&user_id);
        Ok(())
    }
}

// ── Test fixture helpers ─────────────────────────────────────────────────────

pub const TEST_PASSWORD: &str = "Secret#1";

pub fn test_credential(email: &str) -> Credential {
    Credential {
        id: Uuid::new_v4(),
        email: email.to_owned(),
        password_hash: hash_password(TEST_PASSWORD).unwrap(),
        two_factor_enabled: false,
        totp_secret: None,
        last_totp_step: None,
    }
}

pub fn test_cipher() -> SecretCipher {
    SecretCipher::new([7u8; 32])
}
