use anyhow::Context as _;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, DatabaseConnection,
    DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use uuid::Uuid;

use vantra_auth_schema::{backup_codes, outbox_events, password_reset_tokens, sessions, users};

use crate::domain::repository::{
    BackupCodeRepository, CredentialRepository, ResetTokenRepository, SessionRepository,
};
use crate::domain::types::{BackupCode, Credential, OutboxEvent, ResetToken, Session};
use crate::error::AuthServiceError;

// ── Credential repository ─────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbCredentialRepository {
    pub db: DatabaseConnection,
}

impl CredentialRepository for DbCredentialRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<Credential>, AuthServiceError> {
        let model = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.db)
            .await
            .context("find credential by email")?;
        Ok(model.map(credential_from_model))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Credential>, AuthServiceError> {
        let model = users::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .context("find credential by id")?;
        Ok(model.map(credential_from_model))
    }

    async fn update_password_hash(
        &self,
        user_id: Uuid,
        password_hash: &str,
    ) -> Result<(), AuthServiceError> {
        users::ActiveModel {
            id: Set(user_id),
            password_hash: Set(password_hash.to_owned()),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .update(&self.db)
        .await
        .context("update password hash")?;
        Ok(())
    }

    async fn store_pending_secret(
        &self,
        user_id: Uuid,
        secret: &[u8],
    ) -> Result<(), AuthServiceError> {
        users::ActiveModel {
            id: Set(user_id),
            totp_secret: Set(Some(secret.to_vec())),
            last_totp_step: Set(None),
            two_factor_enabled: Set(false),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .update(&self.db)
        .await
        .context("store pending totp secret")?;
        Ok(())
    }

    async fn enable_two_factor(&self, user_id: Uuid) -> Result<bool, AuthServiceError> {
        // The secret-present predicate makes "enabled without a secret"
        // unrepresentable at the storage layer.
        let result = users::Entity::update_many()
            .col_expr(users::Column::TwoFactorEnabled, Expr::value(true))
            .col_expr(users::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(users::Column::Id.eq(user_id))
            .filter(users::Column::TotpSecret.is_not_null())
            .exec(&self.db)
            .await
            .context("enable two-factor")?;
        Ok(result.rows_affected > 0)
    }

    async fn clear_two_factor(&self, user_id: Uuid) -> Result<(), AuthServiceError> {
        users::ActiveModel {
            id: Set(user_id),
            two_factor_enabled: Set(false),
            totp_secret: Set(None),
            last_totp_step: Set(None),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .update(&self.db)
        .await
        .context("clear two-factor state")?;
        Ok(())
    }

    async fn claim_totp_step(&self, user_id: Uuid, step: i64) -> Result<bool, AuthServiceError> {
        // Single guarded UPDATE: only one of two concurrent submissions of the
        // same step can win the claim.
        let result = users::Entity::update_many()
            .col_expr(users::Column::LastTotpStep, Expr::value(step))
            .filter(users::Column::Id.eq(user_id))
            .filter(
                Condition::any()
                    .add(users::Column::LastTotpStep.is_null())
                    .add(users::Column::LastTotpStep.lt(step)),
            )
            .exec(&self.db)
            .await
            .context("claim totp step")?;
        Ok(result.rows_affected > 0)
    }
}

fn credential_from_model(model: users::Model) -> Credential {
    Credential {
        id: model.id,
        email: model.email,
        password_hash: model.password_hash,
        two_factor_enabled: model.two_factor_enabled,
        totp_secret: model.totp_secret,
        last_totp_step: model.last_totp_step,
    }
}

// ── Session repository ────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbSessionRepository {
    pub db: DatabaseConnection,
}

impl SessionRepository for DbSessionRepository {
    async fn create(&self, session: &Session) -> Result<(), AuthServiceError> {
        sessions::ActiveModel {
            token: Set(session.token.clone()),
            user_id: Set(session.user_id),
            ip_address: Set(session.ip_address.clone()),
            user_agent: Set(session.user_agent.clone()),
            created_at: Set(session.created_at),
            updated_at: Set(session.updated_at),
            expires_at: Set(session.expires_at),
        }
        .insert(&self.db)
        .await
        .context("create session")?;
        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<Session>, AuthServiceError> {
        let now = Utc::now();
        let model = sessions::Entity::find_by_id(token.to_owned())
            .filter(sessions::Column::ExpiresAt.gt(now))
            .one(&self.db)
            .await
            .context("find session by token")?;
        Ok(model.map(session_from_model))
    }

    async fn touch(&self, token: &str) -> Result<(), AuthServiceError> {
        sessions::Entity::update_many()
            .col_expr(sessions::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(sessions::Column::Token.eq(token))
            .exec(&self.db)
            .await
            .context("touch session")?;
        Ok(())
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Session>, AuthServiceError> {
        let now = Utc::now();
        let models = sessions::Entity::find()
            .filter(sessions::Column::UserId.eq(user_id))
            .filter(sessions::Column::ExpiresAt.gt(now))
            .order_by_desc(sessions::Column::CreatedAt)
            .all(&self.db)
            .await
            .context("list sessions by user")?;
        Ok(models.into_iter().map(session_from_model).collect())
    }

    async fn delete(&self, user_id: Uuid, token: &str) -> Result<bool, AuthServiceError> {
        let result = sessions::Entity::delete_many()
            .filter(sessions::Column::Token.eq(token))
            .filter(sessions::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await
            .context("delete session")?;
        Ok(result.rows_affected > 0)
    }

    async fn delete_others(
        &self,
        user_id: Uuid,
        except_token: &str,
    ) -> Result<u64, AuthServiceError> {
        let result = sessions::Entity::delete_many()
            .filter(sessions::Column::UserId.eq(user_id))
            .filter(sessions::Column::Token.ne(except_token))
            .exec(&self.db)
            .await
            .context("delete other sessions")?;
        Ok(result.rows_affected)
    }

    async fn delete_all(&self, user_id: Uuid) -> Result<u64, AuthServiceError> {
        let result = sessions::Entity::delete_many()
            .filter(sessions::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await
            .context("delete all sessions")?;
        Ok(result.rows_affected)
    }
}

fn session_from_model(model: sessions::Model) -> Session {
    Session {
        token: model.token,
        user_id: model.user_id,
        ip_address: model.ip_address,
        user_agent: model.user_agent,
        created_at: model.created_at,
        updated_at: model.updated_at,
        expires_at: model.expires_at,
    }
}

// ── Backup-code repository ────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbBackupCodeRepository {
    pub db: DatabaseConnection,
}

impl BackupCodeRepository for DbBackupCodeRepository {
    async fn replace_for_user(
        &self,
        user_id: Uuid,
        code_hashes: &[String],
    ) -> Result<(), AuthServiceError> {
        self.db
            .transaction::<_, (), sea_orm::DbErr>(|txn| {
                let code_hashes = code_hashes.to_vec();
                Box::pin(async move {
                    backup_codes::Entity::delete_many()
                        .filter(backup_codes::Column::UserId.eq(user_id))
                        .exec(txn)
                        .await?;
                    insert_backup_codes(txn, user_id, &code_hashes).await?;
                    Ok(())
                })
            })
            .await
            .context("replace backup codes")?;
        Ok(())
    }

    async fn list_unused(&self, user_id: Uuid) -> Result<Vec<BackupCode>, AuthServiceError> {
        let models = backup_codes::Entity::find()
            .filter(backup_codes::Column::UserId.eq(user_id))
            .filter(backup_codes::Column::Used.eq(false))
            .all(&self.db)
            .await
            .context("list unused backup codes")?;
        Ok(models
            .into_iter()
            .map(|m| BackupCode {
                id: m.id,
                user_id: m.user_id,
                code_hash: m.code_hash,
                used: m.used,
            })
            .collect())
    }

    async fn consume(&self, id: Uuid) -> Result<bool, AuthServiceError> {
        // Only-if-unused predicate: no double-spend under concurrent requests.
        let result = backup_codes::Entity::update_many()
            .col_expr(backup_codes::Column::Used, Expr::value(true))
            .filter(backup_codes::Column::Id.eq(id))
            .filter(backup_codes::Column::Used.eq(false))
            .exec(&self.db)
            .await
            .context("consume backup code")?;
        Ok(result.rows_affected > 0)
    }

    async fn delete_for_user(&self, user_id: Uuid) -> Result<(), AuthServiceError> {
        backup_codes::Entity::delete_many()
            .filter(backup_codes::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await
            .context("delete backup codes")?;
        Ok(())
    }
}

async fn insert_backup_codes(
    txn: &DatabaseTransaction,
    user_id: Uuid,
    code_hashes: &[String],
) -> Result<(), sea_orm::DbErr> {
    let now = Utc::now();
    for hash in code_hashes {
        backup_codes::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            code_hash: Set(hash.clone()),
            used: Set(false),
            created_at: Set(now),
        }
        .insert(txn)
        .await?;
    }
    Ok(())
}

// ── Reset-token repository ────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbResetTokenRepository {
    pub db: DatabaseConnection,
}

impl ResetTokenRepository for DbResetTokenRepository {
    async fn count_active(&self, user_id: Uuid) -> Result<u64, AuthServiceError> {
        let now = Utc::now();
        let count = password_reset_tokens::Entity::find()
            .filter(password_reset_tokens::Column::UserId.eq(user_id))
            .filter(password_reset_tokens::Column::UsedAt.is_null())
            .filter(password_reset_tokens::Column::ExpiresAt.gt(now))
            .count(&self.db)
            .await
            .context("count active reset tokens")?;
        Ok(count)
    }

    async fn create_with_outbox(
        &self,
        token: &ResetToken,
        event: &OutboxEvent,
    ) -> Result<(), AuthServiceError> {
        self.db
            .transaction::<_, (), sea_orm::DbErr>(|txn| {
                let token = token.clone();
                let event = event.clone();
                Box::pin(async move {
                    insert_reset_token(txn, &token).await?;
                    insert_outbox_event(txn, &event).await?;
                    Ok(())
                })
            })
            .await
            .context("create reset token with outbox")?;
        Ok(())
    }

    async fn find_valid(&self, token: &str) -> Result<Option<ResetToken>, AuthServiceError> {
        let now = Utc::now();
        let model = password_reset_tokens::Entity::find()
            .filter(password_reset_tokens::Column::Token.eq(token))
            .filter(password_reset_tokens::Column::UsedAt.is_null())
            .filter(password_reset_tokens::Column::ExpiresAt.gt(now))
            .one(&self.db)
            .await
            .context("find valid reset token")?;
        Ok(model.map(reset_token_from_model))
    }

    async fn mark_used(&self, id: Uuid) -> Result<bool, AuthServiceError> {
        let result = password_reset_tokens::Entity::update_many()
            .col_expr(password_reset_tokens::Column::UsedAt, Expr::value(Utc::now()))
            .filter(password_reset_tokens::Column::Id.eq(id))
            .filter(password_reset_tokens::Column::UsedAt.is_null())
            .exec(&self.db)
            .await
            .context("mark reset token used")?;
        Ok(result.rows_affected > 0)
    }
}

async fn insert_reset_token(
    txn: &DatabaseTransaction,
    token: &ResetToken,
) -> Result<(), sea_orm::DbErr> {
    password_reset_tokens::ActiveModel {
        id: Set(token.id),
        user_id: Set(token.user_id),
        token: Set(token.token.clone()),
        expires_at: Set(token.expires_at),
        used_at: Set(None),
        created_at: Set(token.created_at),
    }
    .insert(txn)
    .await?;
    Ok(())
}

async fn insert_outbox_event(
    txn: &DatabaseTransaction,
    event: &OutboxEvent,
) -> Result<(), sea_orm::DbErr> {
    let now = Utc::now();
    outbox_events::ActiveModel {
        id: Set(event.id),
        kind: Set(event.kind.clone()),
        payload: Set(event.payload.clone()),
        idempotency_key: Set(event.idempotency_key.clone()),
        attempts: Set(0),
        last_error: Set(None),
        created_at: Set(now),
        next_attempt_at: Set(now),
        processed_at: Set(None),
        failed_at: Set(None),
    }
    .insert(txn)
    .await?;
    Ok(())
}

fn reset_token_from_model(model: password_reset_tokens::Model) -> ResetToken {
    ResetToken {
        id: model.id,
        user_id: model.user_id,
        token: model.token,
        expires_at: model.expires_at,
        used_at: model.used_at,
        created_at: model.created_at,
    }
}
