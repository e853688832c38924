use deadpool_redis::Pool as RedisPool;
use sea_orm::DatabaseConnection;

use crate::infra::cache::RedisTwoFactorCache;
use crate::infra::db::{
    DbBackupCodeRepository, DbCredentialRepository, DbResetTokenRepository, DbSessionRepository,
};
use crate::usecase::totp::SecretCipher;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub redis: RedisPool,
    pub cipher: SecretCipher,
    pub totp_issuer: String,
    pub cookie_domain: String,
    pub revoke_other_sessions_on_password_change: bool,
}

impl AppState {
    pub fn credential_repo(&self) -> DbCredentialRepository {
        DbCredentialRepository {
            db: self.db.clone(),
        }
    }

    pub fn session_repo(&self) -> DbSessionRepository {
        DbSessionRepository {
            db: self.db.clone(),
        }
    }

    pub fn backup_code_repo(&self) -> DbBackupCodeRepository {
        DbBackupCodeRepository {
            db: self.db.clone(),
        }
    }

    pub fn reset_token_repo(&self) -> DbResetTokenRepository {
        DbResetTokenRepository {
            db: self.db.clone(),
        }
    }

    pub fn two_factor_cache(&self) -> RedisTwoFactorCache {
        RedisTwoFactorCache {
            pool: self.redis.clone(),
        }
    }
}
